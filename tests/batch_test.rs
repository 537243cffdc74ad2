mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use common::*;
use workday_apply::error::ErrorKind;
use workday_apply::models::ApplicationResult;
use workday_apply::services::RunRecorder;
use workday_apply::{ApplicationFlow, ApplicationStatus, BatchRunner, Config};

fn authorized_advisor() -> ScriptedAdvisor {
    ScriptedAdvisor::new().answer("Are you legally authorized to work?", Answer::Value("Yes".into()))
}

fn runner_with(
    config: &Config,
    driver: &Arc<ScriptedDriver>,
    advisor: ScriptedAdvisor,
    cancel: CancellationToken,
) -> BatchRunner {
    let flow = ApplicationFlow::new(config, driver.clone(), Arc::new(advisor), Arc::new(profile()), None).unwrap();
    BatchRunner::new(Arc::new(flow), cancel, config.shutdown_grace())
}

fn runner(config: &Config, driver: &Arc<ScriptedDriver>, cancel: CancellationToken) -> BatchRunner {
    runner_with(config, driver, authorized_advisor(), cancel)
}

fn read_result(recorder: &RunRecorder, job: &workday_apply::JobTarget) -> ApplicationResult {
    let path = recorder.run_dir().join(job.file_stem()).join("result.json");
    let raw = std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("读取 {} 失败: {}", path.display(), e));
    let envelope: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(envelope["job_index"], job.index);
    serde_json::from_value(envelope["data"].clone()).unwrap()
}

#[tokio::test]
async fn test_every_job_processed_once() {
    let driver = Arc::new(ScriptedDriver::new(PageScript::new(two_step_form())));
    let runner = runner(&test_config(), &driver, CancellationToken::new());

    let stats = runner.run(jobs(7), 3).await;

    assert_eq!(stats.total_jobs, 7);
    assert_eq!(stats.attempted, 7);
    assert_eq!(stats.succeeded, 7);
    assert_eq!(stats.submitted, 7);
    assert!(!stats.interrupted);
    assert!((stats.success_rate() - 1.0).abs() < f64::EPSILON);

    let seen: HashSet<usize> = stats.results.iter().map(|s| s.index).collect();
    assert_eq!(seen.len(), 7);
    assert_eq!(driver.counters.opened(), 7);
    assert_eq!(driver.counters.closed(), 7);
}

#[tokio::test]
async fn test_claims_follow_list_order() {
    let driver = Arc::new(ScriptedDriver::new(PageScript::new(two_step_form())));
    let runner = runner(&test_config(), &driver, CancellationToken::new());

    let stats = runner.run(jobs(3), 2).await;

    assert_eq!(stats.claim_order, vec![1, 2, 3]);
    assert_eq!(stats.attempted, 3);
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_is_bounded() {
    let driver = Arc::new(
        ScriptedDriver::new(PageScript::new(two_step_form())).with_click_delay(Duration::from_millis(200)),
    );
    let runner = runner(&test_config(), &driver, CancellationToken::new());

    let stats = runner.run(jobs(9), 2).await;

    assert_eq!(stats.attempted, 9);
    assert!(driver.counters.max_live() <= 2);
    assert_eq!(driver.counters.max_live(), 2);
}

#[tokio::test]
async fn test_mixed_outcomes_are_counted() {
    let all = jobs(3);
    let driver = Arc::new(
        ScriptedDriver::new(PageScript::new(two_step_form()))
            .with_script(&all[1].url, PageScript::login_redirect())
            .with_script(&all[2].url, PageScript::new(vec![vec![]])),
    );
    let runner = runner(&test_config(), &driver, CancellationToken::new());

    let stats = runner.run(all, 2).await;

    assert_eq!(stats.attempted, 3);
    assert_eq!((stats.succeeded, stats.skipped, stats.failed), (1, 1, 1));
    assert_eq!(
        stats.summary_for(3).and_then(|s| s.error_kind),
        Some(ErrorKind::StructuralMismatch)
    );
    assert_eq!(
        stats.summary_for(2).and_then(|s| s.error_kind),
        Some(ErrorKind::AuthRedirect)
    );
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_stops_dispatch() {
    let driver = Arc::new(
        ScriptedDriver::new(PageScript::new(two_step_form())).with_click_delay(Duration::from_secs(1)),
    );
    let cancel = CancellationToken::new();
    let runner = runner(&test_config(), &driver, cancel.clone());

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(2500)).await;
        cancel.cancel();
    });

    let stats = runner.run(jobs(10), 2).await;

    assert!(stats.interrupted);
    // 中断前只领取了前两个岗位
    assert_eq!(stats.claim_order, vec![1, 2]);
    assert_eq!(stats.attempted, 2);
    assert_eq!(stats.cancelled, 2);
    assert!(stats
        .results
        .iter()
        .all(|s| s.error_kind == Some(ErrorKind::Cancelled) && !s.submitted));
    assert_eq!(driver.counters.opened(), driver.counters.closed());
}

#[tokio::test]
async fn test_empty_job_list() {
    let driver = Arc::new(ScriptedDriver::new(PageScript::new(two_step_form())));
    let runner = runner(&test_config(), &driver, CancellationToken::new());

    let stats = runner.run(Vec::new(), 3).await;

    assert_eq!(stats.attempted, 0);
    assert_eq!(stats.success_rate(), 0.0);
    assert!(stats.claim_order.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_grace_expiry_force_aborts_and_persists() {
    let all = jobs(2);
    let dir = tempfile::tempdir().unwrap();
    let recorder = RunRecorder::create(dir.path()).unwrap();
    let driver = Arc::new(
        ScriptedDriver::new(PageScript::new(two_step_form()))
            .with_click_delay(Duration::from_secs(1))
            .with_close_delay(Duration::from_secs(3600)),
    );
    let cancel = CancellationToken::new();
    let config = test_config();
    let runner = runner(&config, &driver, cancel.clone()).with_recorder(recorder.clone());

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.cancel();
    });

    let started = tokio::time::Instant::now();
    let stats = runner.run(all.clone(), 2).await;
    let elapsed = started.elapsed();

    // 关闭页面卡住：等满宽限期后强制中止，再加上中止后的收尾时间
    assert!(elapsed >= Duration::from_millis(500) + config.shutdown_grace());
    assert!(elapsed <= Duration::from_millis(500) + config.shutdown_grace() + Duration::from_secs(2));

    assert!(stats.interrupted);
    assert_eq!(stats.attempted, 2);
    assert_eq!(stats.cancelled, 2);
    assert_eq!(stats.submitted, 0);

    for job in &all {
        let saved = read_result(&recorder, job);
        assert_eq!(saved.status, ApplicationStatus::Failed);
        assert_eq!(saved.error_kind(), Some(ErrorKind::Cancelled));
        assert!(!saved.submitted);
    }

    // 中止之后由会话守卫在后台再关一次
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(driver.counters.close_calls(), 4);
}

#[tokio::test]
async fn test_worker_panic_is_isolated_and_persisted() {
    let all = jobs(3);
    let dir = tempfile::tempdir().unwrap();
    let recorder = RunRecorder::create(dir.path()).unwrap();
    let driver = Arc::new(ScriptedDriver::new(PageScript::new(two_step_form())).with_script(
        &all[1].url,
        PageScript::new(vec![vec![text_field("motivation", 0, "Why do you want to join?", true)]]),
    ));
    let advisor = authorized_advisor().answer("Why do you want to join?", Answer::Panic);
    let runner = runner_with(&test_config(), &driver, advisor, CancellationToken::new()).with_recorder(recorder.clone());

    let stats = runner.run(all.clone(), 2).await;

    assert!(!stats.interrupted);
    assert_eq!(stats.attempted, 3);
    assert_eq!((stats.succeeded, stats.failed), (2, 1));
    let crashed = stats.summary_for(2).unwrap();
    assert_eq!(crashed.error_kind, Some(ErrorKind::Internal));
    assert!(crashed
        .error_message
        .as_deref()
        .is_some_and(|m| m.contains("advisor blew up")));

    let saved = read_result(&recorder, &all[1]);
    assert_eq!(saved.error_kind(), Some(ErrorKind::Internal));

    // 崩溃的流程也不会留下打开的页面（由会话守卫在后台关闭）
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(driver.counters.opened(), 3);
    assert_eq!(driver.counters.closed(), 3);
}
