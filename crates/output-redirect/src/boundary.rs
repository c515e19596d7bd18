use std::sync::OnceLock;

use regex::Regex;

/// Section banners printed by the test runner, e.g. `====== test session starts ======`
/// or `------ Captured stdout setup begin ------`.
pub const BOUNDARY_PATTERN: &str =
    r"(?i)(={6}).*(begin|start|end|passed|failed|skipped)|(-{6}).*(begin|start)";

fn boundary_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(BOUNDARY_PATTERN).ok()).as_ref()
}

/// Reports whether `message` marks the start or end of a runner section.
pub fn is_boundary(message: &str) -> bool {
    boundary_regex().is_some_and(|re| re.is_match(message))
}

#[cfg(test)]
mod tests {
    use super::is_boundary;

    #[test]
    fn equals_banner_with_keyword_is_boundary() {
        assert!(is_boundary("====== TEST BEGIN ======"));
        assert!(is_boundary("============ 3 passed in 0.02s ============"));
        assert!(is_boundary("====== test session starts ======"));
        assert!(is_boundary("======SKIPPED"));
    }

    #[test]
    fn dash_banner_only_accepts_begin_or_start() {
        assert!(is_boundary("------ begin ------"));
        assert!(is_boundary("------ Captured stdout START"));
        assert!(!is_boundary("------ end ------"));
        assert!(!is_boundary("------ passed ------"));
    }

    #[test]
    fn keyword_must_follow_the_run() {
        assert!(!is_boundary("begin ======"));
        assert!(!is_boundary("start ------"));
    }

    #[test]
    fn short_runs_do_not_match() {
        assert!(!is_boundary("===== begin"));
        assert!(!is_boundary("-----start"));
        assert!(!is_boundary("===FAILED==="));
    }

    #[test]
    fn keyword_matches_inside_words() {
        assert!(is_boundary("======restarted"));
        assert!(is_boundary("====== appended"));
    }

    #[test]
    fn plain_text_is_not_boundary() {
        assert!(!is_boundary("hello world"));
        assert!(!is_boundary(""));
    }

    #[test]
    fn keyword_on_a_later_line_is_ignored() {
        assert!(!is_boundary("======\nbegin"));
    }
}
