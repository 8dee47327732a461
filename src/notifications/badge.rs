/// Label for the unread indicator: nothing at zero, the count up to `cap`,
/// then `"{cap}+"`.
pub fn unread_badge(count: usize, cap: usize) -> Option<String> {
    match count {
        0 => None,
        n if n > cap => Some(format!("{}+", cap)),
        n => Some(n.to_string()),
    }
}
