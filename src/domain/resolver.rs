//! Tiered matching of a normalized path against one site's rules.
//!
//! # Tiers
//!
//! Evaluated in order, first hit wins:
//!
//! 1. Exact match among rules without prefix semantics
//! 2. The same with a trailing `/` appended, when the path has none
//! 3. Optionally, tiers 1-2 against `path?query`
//! 4. Longest literal prefix among catchall and subpath rules
//! 5. No match
//!
//! The resolver is pure: it reads a snapshot and never touches the cache or
//! the store.

use super::entities::RedirectRule;
use super::outcome::{LookupOutcome, RedirectCode};

/// Matcher over a snapshot of one site's rules.
#[derive(Debug, Clone, Copy)]
pub struct MatchResolver<'a> {
    rules: &'a [RedirectRule],
}

impl<'a> MatchResolver<'a> {
    pub fn new(rules: &'a [RedirectRule]) -> Self {
        Self { rules }
    }

    /// Resolves `path` (already normalized, without query).
    ///
    /// When `match_query` is set and `query` is non-empty, exact rules stored
    /// with a query string are also considered; the query is compared
    /// verbatim.
    pub fn resolve(&self, path: &str, query: Option<&str>, match_query: bool) -> LookupOutcome {
        if let Some(rule) = self.exact(path) {
            return Self::outcome_for(rule, rule.new_path.clone(), false);
        }

        if match_query
            && let Some(q) = query.filter(|q| !q.is_empty())
            && let Some(rule) = self.exact_with_query(path, q)
        {
            return Self::outcome_for(rule, rule.new_path.clone(), true);
        }

        if let Some(rule) = self.longest_prefix(path) {
            let target = if rule.subpath_match {
                format!("{}{}", rule.new_path, &path[rule.old_path.len()..])
            } else {
                rule.new_path.clone()
            };
            return Self::outcome_for(rule, target, false);
        }

        LookupOutcome::NoMatch
    }

    /// Tiers 1 and 2.
    fn exact(&self, path: &str) -> Option<&'a RedirectRule> {
        self.find_exact(path, false).or_else(|| {
            if path.ends_with('/') {
                None
            } else {
                self.find_exact(&format!("{}/", path), false)
            }
        })
    }

    /// Tier 3: the slash variant is inserted before the query.
    fn exact_with_query(&self, path: &str, query: &str) -> Option<&'a RedirectRule> {
        self.find_exact(&format!("{}?{}", path, query), true)
            .or_else(|| {
                if path.ends_with('/') {
                    None
                } else {
                    self.find_exact(&format!("{}/?{}", path, query), true)
                }
            })
    }

    /// Rules stored with a query string only take part in the query tier, so
    /// a decoded `%3F` in the path never reaches them.
    fn find_exact(&self, candidate: &str, with_query: bool) -> Option<&'a RedirectRule> {
        self.rules.iter().find(|r| {
            !r.is_prefix_rule()
                && r.old_path.contains('?') == with_query
                && r.old_path == candidate
        })
    }

    /// Tier 4. A longer prefix always beats a shorter one, so a generic rule
    /// never shadows a more specific one.
    fn longest_prefix(&self, path: &str) -> Option<&'a RedirectRule> {
        self.rules
            .iter()
            .filter(|r| r.is_prefix_rule() && path.starts_with(r.old_path.as_str()))
            .max_by_key(|r| r.old_path.len())
    }

    fn outcome_for(rule: &RedirectRule, target: String, query_matched: bool) -> LookupOutcome {
        if rule.is_gone() {
            return LookupOutcome::Gone;
        }

        match RedirectCode::from_response_code(rule.response_code) {
            Some(code) => LookupOutcome::Redirect {
                target,
                code,
                query_matched,
            },
            None => LookupOutcome::Gone,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ResponseCode;
    use chrono::Utc;

    fn rule(old: &str, new: &str, code: ResponseCode) -> RedirectRule {
        RedirectRule {
            id: 0,
            site: 1,
            old_path: old.to_string(),
            new_path: new.to_string(),
            response_code: code,
            catchall_redirect: false,
            subpath_match: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn catchall(old: &str, new: &str, code: ResponseCode) -> RedirectRule {
        RedirectRule {
            catchall_redirect: true,
            ..rule(old, new, code)
        }
    }

    fn subpath(old: &str, new: &str, code: ResponseCode) -> RedirectRule {
        RedirectRule {
            subpath_match: true,
            ..rule(old, new, code)
        }
    }

    fn partial_match_rules() -> Vec<RedirectRule> {
        vec![
            rule("/en/test", "/baz", ResponseCode::Permanent),
            rule("/en/test-page/in", "/bar", ResponseCode::Permanent),
            rule("/en/test-page/internal", "/not-match", ResponseCode::Temporary),
            rule("/en/test-page/other/path", "/foo", ResponseCode::Permanent),
            rule("/en/fobz/", "/fabz", ResponseCode::Permanent),
        ]
    }

    fn flag(rules: &mut [RedirectRule], old: &str, f: impl Fn(&mut RedirectRule)) {
        for r in rules.iter_mut().filter(|r| r.old_path == old) {
            f(r);
        }
    }

    #[test]
    fn test_exact_match() {
        let rules = vec![rule("/en/a", "/en/b/", ResponseCode::Permanent)];
        let resolver = MatchResolver::new(&rules);

        assert_eq!(
            resolver.resolve("/en/a", None, false),
            LookupOutcome::redirect("/en/b/", RedirectCode::Permanent)
        );
    }

    #[test]
    fn test_slash_variant_only_appends() {
        let rules = vec![rule("/en/a/", "/en/b/", ResponseCode::Permanent)];
        let resolver = MatchResolver::new(&rules);
        assert!(resolver.resolve("/en/a", None, false).is_match());
        assert!(resolver.resolve("/en/a/", None, false).is_match());

        let rules = vec![rule("/en/a", "/en/b/", ResponseCode::Permanent)];
        let resolver = MatchResolver::new(&rules);
        assert!(resolver.resolve("/en/a", None, false).is_match());
        assert_eq!(resolver.resolve("/en/a/", None, false), LookupOutcome::NoMatch);
    }

    #[test]
    fn test_plain_rules_do_not_match_as_prefix() {
        let rules = partial_match_rules();
        let resolver = MatchResolver::new(&rules);

        assert_eq!(
            resolver.resolve("/en/test-page/internal-page/", None, false),
            LookupOutcome::NoMatch
        );
    }

    #[test]
    fn test_catchall_ignores_remainder() {
        let mut rules = partial_match_rules();
        flag(&mut rules, "/en/test-page/in", |r| r.catchall_redirect = true);
        let resolver = MatchResolver::new(&rules);

        assert_eq!(
            resolver.resolve("/en/test-page/internal-page/", None, false),
            LookupOutcome::redirect("/bar", RedirectCode::Permanent)
        );
    }

    #[test]
    fn test_subpath_appends_remainder() {
        let rules = vec![subpath("/en/test-page/in", "/bar", ResponseCode::Permanent)];
        let resolver = MatchResolver::new(&rules);

        assert_eq!(
            resolver.resolve("/en/test-page/internal", None, false),
            LookupOutcome::redirect("/barternal", RedirectCode::Permanent)
        );
    }

    #[test]
    fn test_subpath_among_plain_rules() {
        let mut rules = partial_match_rules();
        flag(&mut rules, "/en/test-page/in", |r| r.subpath_match = true);
        let resolver = MatchResolver::new(&rules);

        assert_eq!(
            resolver.resolve("/en/test-page/internal-page/", None, false),
            LookupOutcome::redirect("/barternal-page/", RedirectCode::Permanent)
        );
    }

    #[test]
    fn test_exact_beats_prefix() {
        let mut rules = partial_match_rules();
        flag(&mut rules, "/en/test-page/in", |r| r.subpath_match = true);
        let resolver = MatchResolver::new(&rules);

        assert_eq!(
            resolver.resolve("/en/test-page/internal", None, false),
            LookupOutcome::redirect("/not-match", RedirectCode::Temporary)
        );
        assert_eq!(
            resolver.resolve("/en/test-page/internal/", None, false),
            LookupOutcome::redirect("/barternal/", RedirectCode::Permanent)
        );
    }

    #[test]
    fn test_all_partials_longest_prefix_wins() {
        let mut rules = partial_match_rules();
        for r in rules.iter_mut() {
            r.catchall_redirect = true;
        }
        let resolver = MatchResolver::new(&rules);

        assert_eq!(
            resolver.resolve("/en/test-page/internal-page/", None, false),
            LookupOutcome::redirect("/not-match", RedirectCode::Temporary)
        );
    }

    #[test]
    fn test_longest_prefix_independent_of_order() {
        let mut rules = vec![
            catchall("/a", "/short", ResponseCode::Permanent),
            catchall("/a/b", "/long", ResponseCode::Permanent),
        ];
        let expected = LookupOutcome::redirect("/long", RedirectCode::Permanent);

        assert_eq!(MatchResolver::new(&rules).resolve("/a/b/c", None, false), expected);
        rules.reverse();
        assert_eq!(MatchResolver::new(&rules).resolve("/a/b/c", None, false), expected);
        assert_eq!(
            MatchResolver::new(&rules).resolve("/a/x", None, false),
            LookupOutcome::redirect("/short", RedirectCode::Permanent)
        );
    }

    #[test]
    fn test_gone_code_and_empty_target() {
        let rules = vec![
            rule("/gone/", "/somewhere/", ResponseCode::Gone),
            rule("/empty/", "", ResponseCode::Temporary),
            subpath("/section/", "", ResponseCode::Permanent),
        ];
        let resolver = MatchResolver::new(&rules);

        assert_eq!(resolver.resolve("/gone/", None, false), LookupOutcome::Gone);
        assert_eq!(resolver.resolve("/empty/", None, false), LookupOutcome::Gone);
        assert_eq!(resolver.resolve("/section/x", None, false), LookupOutcome::Gone);
    }

    #[test]
    fn test_query_rule_only_with_query_matching() {
        let rules = vec![
            rule("/promo/?id=7", "/summer/", ResponseCode::Temporary),
            rule("/promo/", "/promos/", ResponseCode::Permanent),
        ];
        let resolver = MatchResolver::new(&rules);

        assert_eq!(
            resolver.resolve("/promo", Some("id=7"), false),
            LookupOutcome::redirect("/promos/", RedirectCode::Permanent)
        );

        let rules = vec![rule("/promo/?id=7", "/summer/", ResponseCode::Temporary)];
        let resolver = MatchResolver::new(&rules);

        assert_eq!(resolver.resolve("/promo", Some("id=7"), false), LookupOutcome::NoMatch);
        assert_eq!(
            resolver.resolve("/promo", Some("id=7"), true),
            LookupOutcome::Redirect {
                target: "/summer/".to_string(),
                code: RedirectCode::Temporary,
                query_matched: true,
            }
        );
        assert_eq!(resolver.resolve("/promo", Some("id=8"), true), LookupOutcome::NoMatch);
    }

    #[test]
    fn test_encoded_question_mark_does_not_reach_query_rules() {
        let rules = vec![rule("/shop/?id=5", "/product/5/", ResponseCode::Permanent)];
        let resolver = MatchResolver::new(&rules);

        assert_eq!(resolver.resolve("/shop/?id=5", None, false), LookupOutcome::NoMatch);
        assert_eq!(resolver.resolve("/shop/?id=5", None, true), LookupOutcome::NoMatch);
        assert!(resolver.resolve("/shop/", Some("id=5"), true).is_match());
    }

    #[test]
    fn test_empty_rule_set() {
        assert_eq!(
            MatchResolver::new(&[]).resolve("/anything", Some("q"), true),
            LookupOutcome::NoMatch
        );
    }
}
