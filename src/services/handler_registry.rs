//! Handler Registry Service
//!
//! Explicit, immutable list of job handlers and the rules that decide which
//! of them apply to an event.

use tracing::debug;

use crate::domain::models::event::{EventEnvelope, EventKind};
use crate::domain::models::job::{JobSpec, JobType, RepositoryConfig};
use crate::domain::models::status::{
    parse_check_name, BUILD_CHECK_PREFIX, PRODUCTION_BUILD_CHECK_PREFIX, TEST_CHECK_PREFIX,
};
use crate::services::comment_parser::{CommandKeyword, ParsedCommand};
use crate::services::handlers::{
    BuildEndHandler, CoprBuildHandler, HandlerConstructor, KojiBuildHandler, TestingFarmHandler,
    TestingFarmResultsHandler,
};

/// Static conditions a handler declares.
#[derive(Debug, Clone, Copy)]
pub struct HandlerPredicate {
    /// Event kinds the handler reacts to.
    pub event_kinds: &'static [EventKind],
    /// Job types the handler serves. Empty means no job config is needed.
    pub job_types: &'static [JobType],
    /// Keyword required when the event is a comment.
    pub command: Option<CommandKeyword>,
    /// Check-name prefix required when the event is a check rerun.
    pub check_prefix: Option<&'static str>,
}

impl HandlerPredicate {
    /// Event-level part of matching: kind, comment command, rerun prefix.
    pub fn accepts_event(&self, envelope: &EventEnvelope, commands: &[ParsedCommand]) -> bool {
        let kind = envelope.kind();
        if !self.event_kinds.contains(&kind) {
            return false;
        }
        if kind.is_comment() {
            let Some(command) = self.command else {
                return false;
            };
            if !commands.iter().any(|parsed| parsed.keyword == command) {
                return false;
            }
        }
        if kind.is_check_rerun() {
            let prefix = envelope
                .data()
                .identifier
                .as_deref()
                .and_then(parse_check_name)
                .map(|(prefix, _)| prefix);
            if self.check_prefix.is_none() || prefix != self.check_prefix {
                return false;
            }
        }
        true
    }

    /// Job-level part of matching for one configured job.
    pub fn accepts_job(
        &self,
        job: &JobSpec,
        envelope: &EventEnvelope,
        commands: &[ParsedCommand],
    ) -> bool {
        if !self.job_types.contains(&job.job_type) {
            return false;
        }
        let Some(trigger_kind) = envelope.trigger_kind() else {
            return false;
        };
        if !job.trigger.accepts(trigger_kind) {
            return false;
        }
        if envelope.kind().is_comment() {
            if let Some(keyword) = job.command_keyword.as_deref() {
                let required = CommandKeyword::from_str(keyword);
                return commands.iter().any(|parsed| Some(parsed.keyword) == required);
            }
        }
        true
    }
}

/// A named handler with its predicate and constructor.
#[derive(Clone, Copy)]
pub struct HandlerRegistration {
    /// Handler name reported in outcomes.
    pub name: &'static str,
    /// When the handler applies.
    pub predicate: HandlerPredicate,
    /// Builds the handler for one matched job.
    pub constructor: HandlerConstructor,
}

impl std::fmt::Debug for HandlerRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistration")
            .field("name", &self.name)
            .field("predicate", &self.predicate)
            .finish_non_exhaustive()
    }
}

/// A registration paired with the job config it matched.
#[derive(Debug, Clone)]
pub struct HandlerMatch<'a> {
    /// The matching handler.
    pub registration: &'a HandlerRegistration,
    /// Job config it matched, absent for job-less handlers.
    pub job: Option<JobSpec>,
}

/// Immutable list of handler registrations, consulted in order.
#[derive(Debug, Clone)]
pub struct HandlerRegistry {
    registrations: Vec<HandlerRegistration>,
}

impl HandlerRegistry {
    /// Registry with the given registrations, in run order.
    pub fn new(registrations: Vec<HandlerRegistration>) -> Self {
        Self { registrations }
    }

    /// The built-in handlers, in the order they run.
    pub fn builtin() -> Self {
        Self::new(vec![
            HandlerRegistration {
                name: "build_end",
                predicate: HandlerPredicate {
                    event_kinds: &[EventKind::BuildEnd],
                    job_types: &[],
                    command: None,
                    check_prefix: None,
                },
                constructor: BuildEndHandler::boxed,
            },
            HandlerRegistration {
                name: "copr_build",
                predicate: HandlerPredicate {
                    event_kinds: &[
                        EventKind::PullRequest,
                        EventKind::Push,
                        EventKind::Release,
                        EventKind::PullRequestComment,
                        EventKind::CheckRerunPullRequest,
                        EventKind::CheckRerunCommit,
                        EventKind::CheckRerunRelease,
                    ],
                    job_types: &[JobType::Build],
                    command: Some(CommandKeyword::Build),
                    check_prefix: Some(BUILD_CHECK_PREFIX),
                },
                constructor: CoprBuildHandler::boxed,
            },
            HandlerRegistration {
                name: "koji_build",
                predicate: HandlerPredicate {
                    event_kinds: &[
                        EventKind::PullRequest,
                        EventKind::Push,
                        EventKind::Release,
                        EventKind::PullRequestComment,
                        EventKind::CheckRerunPullRequest,
                        EventKind::CheckRerunCommit,
                        EventKind::CheckRerunRelease,
                    ],
                    job_types: &[JobType::ProductionBuild],
                    command: Some(CommandKeyword::ProductionBuild),
                    check_prefix: Some(PRODUCTION_BUILD_CHECK_PREFIX),
                },
                constructor: KojiBuildHandler::boxed,
            },
            HandlerRegistration {
                name: "testing_farm",
                predicate: HandlerPredicate {
                    event_kinds: &[
                        EventKind::PullRequest,
                        EventKind::Push,
                        EventKind::Release,
                        EventKind::PullRequestComment,
                        EventKind::CheckRerunPullRequest,
                        EventKind::CheckRerunCommit,
                        EventKind::CheckRerunRelease,
                        EventKind::BuildEnd,
                    ],
                    job_types: &[JobType::Tests],
                    command: Some(CommandKeyword::Test),
                    check_prefix: Some(TEST_CHECK_PREFIX),
                },
                constructor: TestingFarmHandler::boxed,
            },
            HandlerRegistration {
                name: "testing_farm_results",
                predicate: HandlerPredicate {
                    event_kinds: &[EventKind::TestingFarmResults],
                    job_types: &[],
                    command: None,
                    check_prefix: None,
                },
                constructor: TestingFarmResultsHandler::boxed,
            },
        ])
    }

    /// All registrations in run order.
    pub fn registrations(&self) -> &[HandlerRegistration] {
        &self.registrations
    }

    /// Looks a registration up by handler name.
    pub fn get(&self, name: &str) -> Option<&HandlerRegistration> {
        self.registrations.iter().find(|r| r.name == name)
    }

    /// Every `(registration, job)` pair that applies to the event.
    ///
    /// Pure: nothing is resolved or stored. Pairs come in registration
    /// order, then job order within the repository config.
    pub fn matching(
        &self,
        envelope: &EventEnvelope,
        repo_config: &RepositoryConfig,
        commands: &[ParsedCommand],
    ) -> Vec<HandlerMatch<'_>> {
        let mut matches = Vec::new();
        for registration in &self.registrations {
            let predicate = &registration.predicate;
            if !predicate.accepts_event(envelope, commands) {
                continue;
            }
            if predicate.job_types.is_empty() {
                matches.push(HandlerMatch {
                    registration,
                    job: None,
                });
                continue;
            }
            for job in &repo_config.jobs {
                if predicate.accepts_job(job, envelope, commands) {
                    matches.push(HandlerMatch {
                        registration,
                        job: Some(job.clone()),
                    });
                }
            }
        }
        debug!(
            kind = %envelope.kind(),
            matched = matches.len(),
            handlers = ?matches.iter().map(|m| m.registration.name).collect::<Vec<_>>(),
            "Matched handlers"
        );
        matches
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::event::EventData;
    use crate::domain::models::job::JobTriggerType;
    use crate::domain::models::trigger::{TriggerKind, TriggerReference};
    use crate::services::comment_parser::{parse_commands, DEFAULT_COMMAND_PREFIX};
    use uuid::Uuid;

    fn names(matches: &[HandlerMatch<'_>]) -> Vec<&'static str> {
        matches.iter().map(|m| m.registration.name).collect()
    }

    fn pr_jobs() -> RepositoryConfig {
        RepositoryConfig::new(vec![
            JobSpec::new(JobType::Build, JobTriggerType::PullRequest, ["fedora-35-x86_64"]),
            JobSpec::new(JobType::Tests, JobTriggerType::PullRequest, ["fedora-35-x86_64"]),
            JobSpec::new(JobType::ProductionBuild, JobTriggerType::Push, ["rawhide"]),
        ])
    }

    fn comment(body: &str) -> (EventEnvelope, Vec<ParsedCommand>) {
        let data = EventData::new(EventKind::PullRequestComment, "user")
            .with_pull_request(1)
            .with_comment(body);
        (EventEnvelope::new(data), parse_commands(body, DEFAULT_COMMAND_PREFIX))
    }

    #[test]
    fn test_builtin_registration_order() {
        let registry = HandlerRegistry::builtin();
        let names: Vec<_> = registry.registrations().iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec!["build_end", "copr_build", "koji_build", "testing_farm", "testing_farm_results"]
        );
        assert!(registry.get("testing_farm").is_some());
        assert!(registry.get("propose_downstream").is_none());
    }

    #[test]
    fn test_comment_command_selects_handler() {
        let registry = HandlerRegistry::builtin();
        let config = pr_jobs();

        let (envelope, commands) = comment("/packit test");
        let matches = registry.matching(&envelope, &config, &commands);
        assert_eq!(names(&matches), vec!["testing_farm"]);
        assert_eq!(matches[0].job.as_ref().map(|j| j.job_type), Some(JobType::Tests));

        let (envelope, commands) = comment("/packit build");
        assert_eq!(names(&registry.matching(&envelope, &config, &commands)), vec!["copr_build"]);

        let (envelope, commands) = comment("thanks!");
        assert!(registry.matching(&envelope, &config, &commands).is_empty());
    }

    #[test]
    fn test_trigger_type_must_be_compatible() {
        let registry = HandlerRegistry::builtin();
        let config = RepositoryConfig::new(vec![JobSpec::new(
            JobType::Tests,
            JobTriggerType::Push,
            ["fedora-35-x86_64"],
        )]);
        let (envelope, commands) = comment("/packit test");
        assert!(registry.matching(&envelope, &config, &commands).is_empty());
    }

    #[test]
    fn test_every_matching_job_is_paired() {
        let registry = HandlerRegistry::builtin();
        let config = RepositoryConfig::new(vec![
            JobSpec::new(JobType::Tests, JobTriggerType::PullRequest, ["a"]),
            JobSpec::new(JobType::Tests, JobTriggerType::PullRequest, ["b"]),
        ]);
        let (envelope, commands) = comment("/packit test");
        let matches = registry.matching(&envelope, &config, &commands);
        assert_eq!(matches.len(), 2);
        assert!(matches[0].job.as_ref().unwrap().targets.contains("a"));
        assert!(matches[1].job.as_ref().unwrap().targets.contains("b"));
    }

    #[test]
    fn test_job_command_keyword_restricts_comments() {
        let registry = HandlerRegistry::builtin();
        let config = RepositoryConfig::new(vec![JobSpec::new(
            JobType::Build,
            JobTriggerType::PullRequest,
            ["a"],
        )
        .with_command_keyword("copr-build")]);

        let (envelope, commands) = comment("/packit build");
        assert_eq!(registry.matching(&envelope, &config, &commands).len(), 1);
    }

    #[test]
    fn test_check_rerun_prefix() {
        let registry = HandlerRegistry::builtin();
        let config = pr_jobs();
        let rerun = |check: &str| {
            EventEnvelope::new(
                EventData::new(EventKind::CheckRerunPullRequest, "user")
                    .with_pull_request(1)
                    .with_identifier(check),
            )
        };

        let envelope = rerun("testing-farm:fedora-35-x86_64");
        assert_eq!(names(&registry.matching(&envelope, &config, &[])), vec!["testing_farm"]);

        let envelope = rerun("rpm-build:fedora-35-x86_64");
        assert_eq!(names(&registry.matching(&envelope, &config, &[])), vec!["copr_build"]);

        let envelope = rerun("something-else:fedora-35-x86_64");
        assert!(registry.matching(&envelope, &config, &[]).is_empty());
    }

    #[test]
    fn test_results_handler_needs_no_job_config() {
        let registry = HandlerRegistry::builtin();
        let envelope = EventEnvelope::new(
            EventData::new(EventKind::TestingFarmResults, "testing-farm").with_identifier("p"),
        );
        let matches = registry.matching(&envelope, &RepositoryConfig::default(), &[]);
        assert_eq!(names(&matches), vec!["testing_farm_results"]);
        assert!(matches[0].job.is_none());
    }

    #[test]
    fn test_build_end_uses_resolved_trigger_kind() {
        let registry = HandlerRegistry::builtin();
        let data = EventData::new(EventKind::BuildEnd, "build-service").with_build_id(Uuid::new_v4());

        let unresolved = EventEnvelope::new(data.clone());
        assert_eq!(
            names(&registry.matching(&unresolved, &pr_jobs(), &[])),
            vec!["build_end"]
        );

        let resolved = EventEnvelope::with_resolved_trigger(
            data,
            Some(TriggerReference::new(TriggerKind::PullRequest, Uuid::new_v4())),
        );
        assert_eq!(
            names(&registry.matching(&resolved, &pr_jobs(), &[])),
            vec!["build_end", "testing_farm"]
        );
    }
}
