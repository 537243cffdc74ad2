use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use workday_apply::browser::open_driver;
use workday_apply::config::Config;
use workday_apply::infrastructure::BrowserDriver;
use workday_apply::logger;
use workday_apply::models::load_profile;
use workday_apply::services::LlmService;
use workday_apply::{ApplicationFlow, JobCtx, JobTarget};

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_browser_connection() {
    logger::init(true);

    let config = Config::from_env().expect("读取配置失败");
    let driver = open_driver(&config).await.expect("连接浏览器失败");

    let session = driver
        .open("https://www.myworkday.com/")
        .await
        .expect("打开页面失败");
    let snapshot = session.inspect().await.expect("检查页面失败");
    println!("当前地址: {}", snapshot.url);

    session.close().await.expect("关闭页面失败");
    driver.shutdown().await.expect("关闭浏览器失败");
}

/// 真实跑一个岗位，会真正点击提交，请用测试岗位
///
/// 需要设置 WORKDAY_SMOKE_URL 和 LLM 相关环境变量。
#[tokio::test]
#[ignore]
async fn test_single_job_smoke() {
    logger::init(true);

    let url = std::env::var("WORKDAY_SMOKE_URL").expect("需要设置 WORKDAY_SMOKE_URL");
    let config = Config::from_env().expect("读取配置失败");
    let profile = load_profile(&config.profile_file).await.expect("加载个人资料失败");
    let driver = Arc::new(open_driver(&config).await.expect("连接浏览器失败"));
    let advisor = Arc::new(LlmService::new(&config));

    let flow = ApplicationFlow::new(&config, driver.clone(), advisor, Arc::new(profile), None)
        .expect("创建流程失败");
    let job = JobTarget::new(1, url, "smoke");
    let ctx = JobCtx::new(&job, 1, CancellationToken::new());

    let result = flow.run(&job, &ctx).await;
    println!("状态: {:?}, 错误: {:?}", result.status, result.error);
    println!("提取 {} 个字段, 步骤 {}", result.extracted.len(), result.wizard_steps);
    assert!(result.timing.total_ms > 0);

    driver.shutdown().await.expect("关闭浏览器失败");
}
