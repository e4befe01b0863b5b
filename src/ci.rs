use crate::config::{PullRequest, Repository};
use crate::env::Environment;
use regex::Regex;
use std::sync::LazyLock;

static GITHUB_PR_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^refs/pull/(\d+)/").expect("valid regex"));
static PR_URL_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/pull/(\d+)/?$").expect("valid regex"));

/// What a CI provider tells us about the current build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CiContext {
    pub provider: &'static str,
    pub is_pull_request: bool,
    pub pull_request: PullRequest,
    pub repository: Repository,
}

pub trait Detector {
    fn name(&self) -> &'static str;

    /// Returns `None` when the build is not running on this provider.
    fn detect(&self, env: &dyn Environment) -> Option<CiContext>;
}

pub struct Travis;
pub struct GitHubActions;
pub struct CircleCi;

/// Detectors in query order.
pub const DETECTORS: &[&dyn Detector] = &[&Travis, &GitHubActions, &CircleCi];

/// Queries each detector in order; the first provider that recognizes the
/// environment wins.
pub fn detect(env: &dyn Environment) -> Option<CiContext> {
    DETECTORS.iter().find_map(|d| d.detect(env))
}

impl Detector for Travis {
    fn name(&self) -> &'static str {
        "Travis CI"
    }

    fn detect(&self, env: &dyn Environment) -> Option<CiContext> {
        if !env.is_true("TRAVIS") {
            return None;
        }

        // TRAVIS_PULL_REQUEST is "false" on push builds
        let number = env
            .non_empty("TRAVIS_PULL_REQUEST")
            .and_then(|v| v.parse::<u64>().ok());
        let is_pull_request =
            env.var("TRAVIS_EVENT_TYPE").as_deref() == Some("pull_request") || number.is_some();

        Some(CiContext {
            provider: self.name(),
            is_pull_request,
            pull_request: PullRequest {
                number,
                sha: env.non_empty("TRAVIS_PULL_REQUEST_SHA"),
            },
            repository: env
                .non_empty("TRAVIS_REPO_SLUG")
                .map(|s| parse_slug(&s))
                .unwrap_or_default(),
        })
    }
}

impl Detector for GitHubActions {
    fn name(&self) -> &'static str {
        "GitHub Actions"
    }

    fn detect(&self, env: &dyn Environment) -> Option<CiContext> {
        if !env.is_true("GITHUB_ACTIONS") {
            return None;
        }

        let is_pull_request = matches!(
            env.var("GITHUB_EVENT_NAME").as_deref(),
            Some("pull_request" | "pull_request_target")
        );
        let number = env
            .non_empty("GITHUB_REF")
            .and_then(|r| capture_number(&GITHUB_PR_REF, &r));

        Some(CiContext {
            provider: self.name(),
            is_pull_request,
            pull_request: PullRequest {
                number,
                sha: env.non_empty("GITHUB_SHA"),
            },
            repository: env
                .non_empty("GITHUB_REPOSITORY")
                .map(|s| parse_slug(&s))
                .unwrap_or_default(),
        })
    }
}

impl Detector for CircleCi {
    fn name(&self) -> &'static str {
        "CircleCI"
    }

    fn detect(&self, env: &dyn Environment) -> Option<CiContext> {
        if !env.is_true("CIRCLECI") {
            return None;
        }

        let pr_number = env.non_empty("CIRCLE_PR_NUMBER");
        let pr_url = env.non_empty("CIRCLE_PULL_REQUEST");
        let is_pull_request = pr_number.is_some() || pr_url.is_some();
        let number = pr_number
            .and_then(|n| n.parse::<u64>().ok())
            .or_else(|| pr_url.and_then(|u| capture_number(&PR_URL_NUMBER, &u)));

        Some(CiContext {
            provider: self.name(),
            is_pull_request,
            pull_request: PullRequest {
                number,
                sha: env.non_empty("CIRCLE_SHA1"),
            },
            repository: Repository {
                owner: env.non_empty("CIRCLE_PROJECT_USERNAME"),
                name: env.non_empty("CIRCLE_PROJECT_REPONAME"),
            },
        })
    }
}

fn capture_number(re: &Regex, haystack: &str) -> Option<u64> {
    re.captures(haystack)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Splits an `owner/name` slug. Anything else leaves both parts unset.
fn parse_slug(slug: &str) -> Repository {
    match slug.trim().split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Repository {
                owner: Some(owner.to_string()),
                name: Some(name.to_string()),
            }
        }
        _ => Repository::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MapEnv;

    #[test]
    fn test_no_provider() {
        let env = MapEnv::from_iter([("HOME", "/root")]);
        assert_eq!(detect(&env), None);
    }

    #[test]
    fn test_travis_pull_request() {
        let env = MapEnv::from_iter([
            ("TRAVIS", "true"),
            ("TRAVIS_EVENT_TYPE", "pull_request"),
            ("TRAVIS_PULL_REQUEST", "42"),
            ("TRAVIS_PULL_REQUEST_SHA", "abc123"),
            ("TRAVIS_REPO_SLUG", "octo/site"),
        ]);
        let ctx = detect(&env).unwrap();
        assert_eq!(ctx.provider, "Travis CI");
        assert!(ctx.is_pull_request);
        assert_eq!(ctx.pull_request.number, Some(42));
        assert_eq!(ctx.pull_request.sha.as_deref(), Some("abc123"));
        assert_eq!(ctx.repository.owner.as_deref(), Some("octo"));
        assert_eq!(ctx.repository.name.as_deref(), Some("site"));
    }

    #[test]
    fn test_travis_push_build() {
        let env = MapEnv::from_iter([
            ("TRAVIS", "true"),
            ("TRAVIS_EVENT_TYPE", "push"),
            ("TRAVIS_PULL_REQUEST", "false"),
            ("TRAVIS_REPO_SLUG", "octo/site"),
        ]);
        let ctx = detect(&env).unwrap();
        assert!(!ctx.is_pull_request);
        assert_eq!(ctx.pull_request, PullRequest::default());
        assert_eq!(ctx.repository.owner.as_deref(), Some("octo"));
    }

    #[test]
    fn test_github_actions_pull_request() {
        let env = MapEnv::from_iter([
            ("GITHUB_ACTIONS", "true"),
            ("GITHUB_EVENT_NAME", "pull_request"),
            ("GITHUB_REF", "refs/pull/7/merge"),
            ("GITHUB_SHA", "deadbeef"),
            ("GITHUB_REPOSITORY", "octo/site"),
        ]);
        let ctx = detect(&env).unwrap();
        assert_eq!(ctx.provider, "GitHub Actions");
        assert!(ctx.is_pull_request);
        assert_eq!(ctx.pull_request.number, Some(7));
        assert_eq!(ctx.pull_request.sha.as_deref(), Some("deadbeef"));
        assert_eq!(ctx.repository.name.as_deref(), Some("site"));
    }

    #[test]
    fn test_github_actions_branch_push() {
        let env = MapEnv::from_iter([
            ("GITHUB_ACTIONS", "true"),
            ("GITHUB_EVENT_NAME", "push"),
            ("GITHUB_REF", "refs/heads/main"),
        ]);
        let ctx = detect(&env).unwrap();
        assert!(!ctx.is_pull_request);
        assert_eq!(ctx.pull_request.number, None);
        assert_eq!(ctx.repository, Repository::default());
    }

    #[test]
    fn test_circleci_number_from_url() {
        let env = MapEnv::from_iter([
            ("CIRCLECI", "true"),
            ("CIRCLE_PULL_REQUEST", "https://github.com/octo/site/pull/19"),
            ("CIRCLE_SHA1", "cafe"),
            ("CIRCLE_PROJECT_USERNAME", "octo"),
            ("CIRCLE_PROJECT_REPONAME", "site"),
        ]);
        let ctx = detect(&env).unwrap();
        assert_eq!(ctx.provider, "CircleCI");
        assert!(ctx.is_pull_request);
        assert_eq!(ctx.pull_request.number, Some(19));
        assert_eq!(ctx.repository.owner.as_deref(), Some("octo"));
    }

    #[test]
    fn test_first_detector_wins() {
        let env = MapEnv::from_iter([
            ("TRAVIS", "true"),
            ("TRAVIS_PULL_REQUEST", "false"),
            ("GITHUB_ACTIONS", "true"),
            ("GITHUB_EVENT_NAME", "pull_request"),
        ]);
        let ctx = detect(&env).unwrap();
        assert_eq!(ctx.provider, "Travis CI");
        assert!(!ctx.is_pull_request);
    }

    #[test]
    fn test_parse_slug() {
        assert_eq!(parse_slug("a/b").name.as_deref(), Some("b"));
        assert_eq!(parse_slug("nope"), Repository::default());
        assert_eq!(parse_slug("/b"), Repository::default());
        assert_eq!(parse_slug("a/b/c"), Repository::default());
    }
}
