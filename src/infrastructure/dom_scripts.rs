//! Workday 页面脚本
//!
//! 所有脚本都以 `JsExecutor::call` 的函数体形式执行，参数从 `args` 读取。
//! 定位规则和字段提取保持一致：有 DOM id（或单选组名、唯一的 name）用它，
//! 否则用“标签 + 同名标签序号”锚定，连标签都没有才退回表单容器内的位置。

/// 公共辅助函数，拼在每个脚本前面
pub const PRELUDE: &str = r#"
const CONTAINER = 'div[data-automation-id="applyFlowPage"], form[data-automation-id="applyFlowForm"], form';
const FIELDS = 'input, select, textarea, button[aria-haspopup="listbox"]';
const container = () => document.querySelector(CONTAINER);
const elements = () => {
    const root = container();
    return root ? Array.from(root.querySelectorAll(FIELDS)) : [];
};
const visible = (el) => !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length);
const text = (el) => (el ? (el.innerText || el.textContent || '').trim() : '');
const labelOf = (el) => {
    if (el.id) {
        const lbl = document.querySelector(`label[for="${CSS.escape(el.id)}"]`);
        if (lbl) return text(lbl);
    }
    const aria = el.getAttribute('aria-label');
    if (aria) return aria.trim();
    const group = el.closest('fieldset');
    if (group && (el.type === 'radio' || el.type === 'checkbox')) {
        const legend = group.querySelector('legend');
        if (legend) return text(legend);
    }
    const wrapper = el.closest('[data-automation-id^="formField"]');
    if (wrapper) {
        const lbl = wrapper.querySelector('label, legend');
        if (lbl) return text(lbl);
    }
    return el.getAttribute('placeholder') || el.getAttribute('name') || '';
};
const keyOf = (el) => {
    if (el.type === 'radio' && el.name) return el.name;
    if (el.id) return el.id;
    const root = container();
    if (el.name && root && root.querySelectorAll(`[name="${CSS.escape(el.name)}"]`).length === 1) {
        return `name:${el.name}`;
    }
    return null;
};
const SECTION_KEYWORDS = {
    work_experience: ['work', 'experience', 'history'],
    education: ['education'],
};
const sectionName = (group) => {
    const ref = (group.getAttribute('aria-labelledby') || '').toLowerCase();
    return Object.keys(SECTION_KEYWORDS).find((name) => SECTION_KEYWORDS[name].some((k) => ref.includes(k))) || null;
};
const sections = () => Array.from(document.querySelectorAll('div[role="group"][aria-labelledby]'))
    .filter((g) => sectionName(g) && !(g.parentElement && g.parentElement.closest('div[role="group"][aria-labelledby]')));
const sectionRoot = (name) => sections().find((g) => sectionName(g) === name) || null;
const entryOf = (el) => {
    const group = sections().find((g) => g.contains(el));
    if (!group) return null;
    let node = el;
    while (node && node !== group) {
        const m = /(\d+)-panel/.exec(node.getAttribute ? node.getAttribute('aria-labelledby') || '' : '');
        if (m) return { section: sectionName(group), index: Number(m[1]) - 1 };
        node = node.parentElement;
    }
    return null;
};
const locate = (key) => {
    const anchored = /^step\d+-label(\d+):([\s\S]*)$/.exec(key);
    if (anchored) return elements().filter((e) => labelOf(e) === anchored[2])[Number(anchored[1])] || null;
    const m = /^step\d+-pos(\d+)$/.exec(key);
    if (m) return elements()[Number(m[1])] || null;
    if (key.startsWith('name:')) {
        const root = container();
        return root ? root.querySelector(`[name="${CSS.escape(key.slice(5))}"]`) : null;
    }
    const radios = document.querySelectorAll(`input[type="radio"][name="${CSS.escape(key)}"]`);
    if (radios.length) return radios[0];
    return document.getElementById(key);
};
const radioLabel = (r) => {
    const lbl = r.id ? document.querySelector(`label[for="${CSS.escape(r.id)}"]`) : null;
    return lbl ? text(lbl) : (r.value || '');
};
const fire = (el) => {
    el.dispatchEvent(new Event('input', { bubbles: true }));
    el.dispatchEvent(new Event('change', { bubbles: true }));
    el.dispatchEvent(new Event('blur', { bubbles: true }));
};
const sleep = (ms) => new Promise((r) => setTimeout(r, ms));
const footerButton = () => document.querySelector('button[data-automation-id="pageFooterNextButton"]');
const isSubmitText = (t) => /submit/i.test(t);
"#;

/// 提取当前步骤的原始字段，没有表单容器时返回 `null`
pub const QUERY_FIELDS: &str = r#"
const root = container();
if (!root) return null;
const seenRadio = new Set();
const seenLabel = new Map();
const out = [];
elements().forEach((el, position) => {
    const tag = el.tagName.toLowerCase();
    const type = (el.getAttribute('type') || '').toLowerCase();
    const label = labelOf(el);
    const labelIndex = seenLabel.get(label) || 0;
    seenLabel.set(label, labelIndex + 1);
    if (type === 'radio') {
        if (el.name && seenRadio.has(el.name)) return;
        if (el.name) seenRadio.add(el.name);
    }
    let options = [];
    if (tag === 'select') {
        options = Array.from(el.options).map((o) => o.text.trim());
    } else if (type === 'radio' && el.name) {
        options = Array.from(root.querySelectorAll(`input[type="radio"][name="${CSS.escape(el.name)}"]`)).map(radioLabel);
    } else if (tag === 'button') {
        const listId = el.getAttribute('aria-controls');
        const list = listId ? document.getElementById(listId) : null;
        if (list) options = Array.from(list.querySelectorAll('[role="option"]')).map(text);
    }
    let value = null;
    if (tag === 'button') value = text(el);
    else if (tag === 'select') value = el.selectedIndex >= 0 ? el.options[el.selectedIndex].text.trim() : null;
    else if (type === 'checkbox') value = el.checked ? 'Yes' : 'No';
    else if (type === 'radio') {
        const checked = el.name ? root.querySelector(`input[type="radio"][name="${CSS.escape(el.name)}"]:checked`) : null;
        value = checked ? radioLabel(checked) : null;
    } else if (type !== 'file') value = el.value;
    out.push({
        key: keyOf(el),
        position,
        tag,
        inputType: type || null,
        role: el.getAttribute('role'),
        label,
        labelIndex,
        entry: entryOf(el),
        required: el.required || el.getAttribute('aria-required') === 'true',
        listbox: tag === 'button' && el.getAttribute('aria-haspopup') === 'listbox',
        options,
        accept: el.getAttribute('accept'),
        value,
        hidden: type === 'hidden' || (!visible(el) && type !== 'file'),
    });
});
return out;
"#;

/// 写入文本 / 下拉 / 单选 / 复选，返回是否找到元素
///
/// args: `{ key, text, flag }`
pub const WRITE_VALUE: &str = r#"
const el = locate(args.key);
if (!el) return false;
const tag = el.tagName.toLowerCase();
const type = (el.getAttribute('type') || '').toLowerCase();
const wanted = (args.text || '').trim().toLowerCase();
el.scrollIntoView({ block: 'center' });

if (type === 'checkbox') {
    if (el.checked !== args.flag) el.click();
    return true;
}
if (type === 'radio') {
    const group = Array.from(document.querySelectorAll(`input[type="radio"][name="${CSS.escape(el.name)}"]`));
    const target = group.find((r) => radioLabel(r).trim().toLowerCase() === wanted);
    if (!target) return false;
    target.click();
    return true;
}
if (tag === 'select') {
    const opt = Array.from(el.options).find((o) => o.text.trim().toLowerCase() === wanted);
    if (!opt) return false;
    el.value = opt.value;
    fire(el);
    return true;
}
if (tag === 'button') {
    el.click();
    await sleep(400);
    const opts = Array.from(document.querySelectorAll('[role="option"]'));
    const opt = opts.find((o) => text(o).toLowerCase() === wanted)
        || opts.find((o) => text(o).toLowerCase().includes(wanted));
    if (!opt) {
        document.body.dispatchEvent(new KeyboardEvent('keydown', { key: 'Escape', bubbles: true }));
        return false;
    }
    opt.click();
    await sleep(300);
    return true;
}
const proto = tag === 'textarea' ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
el.focus();
setter.call(el, args.text || '');
fire(el);
return true;
"#;

/// 回读字段当前值
///
/// args: `{ key }`
pub const READ_VALUE: &str = r#"
const el = locate(args.key);
if (!el) return null;
const tag = el.tagName.toLowerCase();
const type = (el.getAttribute('type') || '').toLowerCase();
if (type === 'checkbox') return el.checked ? 'Yes' : 'No';
if (type === 'radio') {
    const checked = document.querySelector(`input[type="radio"][name="${CSS.escape(el.name)}"]:checked`);
    return checked ? radioLabel(checked) : null;
}
if (type === 'file') {
    if (el.files && el.files.length) return el.files[0].name;
    const item = document.querySelector('[data-automation-id="file-upload-item-name"], [data-automation-id="file-upload-successful"]');
    return item ? text(item) : null;
}
if (tag === 'select') return el.selectedIndex >= 0 ? el.options[el.selectedIndex].text.trim() : null;
if (tag === 'button') return text(el);
return el.value;
"#;

/// 文件输入框在 `input[type="file"]` 中的序号，找不到返回 `null`
///
/// args: `{ key }`
pub const FILE_INPUT_INDEX: &str = r#"
const el = locate(args.key);
if (!el) return null;
const all = Array.from(document.querySelectorAll('input[type="file"]'));
const idx = all.indexOf(el);
return idx >= 0 ? idx : null;
"#;

/// 点击操作按钮，返回是否点到
///
/// args: `{ action }`，`action` 是字符串，或者 `{ add_entry: "<section>" }`
pub const CLICK_ACTION: &str = r#"
const action = typeof args.action === 'string' ? args.action : Object.keys(args.action || {})[0];
let btn = null;
switch (action) {
    case 'start_application':
        btn = document.querySelector('a[data-automation-id="adventureButton"], button[data-automation-id="adventureButton"]');
        break;
    case 'apply_manually':
        btn = document.querySelector('a[data-automation-id="applyManually"], button[data-automation-id="applyManually"]');
        break;
    case 'next_step': {
        const b = footerButton();
        btn = b && !isSubmitText(text(b)) ? b : null;
        break;
    }
    case 'submit': {
        const b = footerButton();
        btn = (b && isSubmitText(text(b))) ? b : document.querySelector('button[data-automation-id="submitButton"]');
        break;
    }
    case 'add_entry': {
        const group = sectionRoot(args.action.add_entry);
        const adds = group ? group.querySelectorAll('button[data-automation-id="add-button"]') : [];
        btn = adds.length ? adds[adds.length - 1] : null;
        break;
    }
}
if (!btn || btn.disabled) return false;
btn.scrollIntoView({ block: 'center' });
btn.click();
return true;
"#;

/// 页面状态快照
pub const INSPECT: &str = r#"
const body = document.body ? document.body.innerText : '';
const footer = footerButton();
const footerText = text(footer);
const banner = document.querySelector('[data-automation-id="errorBanner"], [role="alert"][data-automation-id*="error"]');
return {
    url: location.href,
    authWall: !!document.querySelector('[data-automation-id="signInContent"], [data-automation-id="createAccountLink"], [data-automation-id="signInLink"], input[type="password"]'),
    errorBanner: banner && text(banner) ? text(banner) : null,
    nextStep: !!footer && !isSubmitText(footerText),
    finalSubmit: (!!footer && isSubmitText(footerText)) || !!document.querySelector('button[data-automation-id="submitButton"]'),
    confirmation: !!document.querySelector('[data-automation-id="congratulationsPopup"], [data-automation-id="applicationSubmitted"]')
        || /application (was )?submitted|thank you for applying/i.test(body),
    addSections: sections()
        .filter((g) => g.querySelector('button[data-automation-id="add-button"]'))
        .map(sectionName),
};
"#;

/// 拼上公共辅助函数
pub fn with_prelude(body: &str) -> String {
    format!("{}\n{}", PRELUDE, body)
}
