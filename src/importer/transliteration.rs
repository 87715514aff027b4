// ==========================================
// Excel2DB - 拼音首字母
// ==========================================
// 职责: 由中文名称派生代号（大写拼音首字母）
// 规则: 汉字取拼音首字母并转大写；非汉字字符原样保留
// ==========================================

use pinyin::ToPinyin;

/// 拼音首字母代号
///
/// # 示例
/// - "感冒" → "GM"
/// - "B型肝炎" → "BXGY"
pub fn pinyin_initials(text: &str) -> String {
    text.trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c.to_pinyin() {
            Some(py) => py.first_letter().to_uppercase(),
            None => c.to_string(),
        })
        .collect()
}
