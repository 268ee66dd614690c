//! Known wsadmin output signatures

use declarative::{Classifier, RecoverableReason, Signature};

/// Lines that carry one of these are errors unless a signature explains them
pub const ERROR_MARKERS: &[&str] = &["Exception", "Traceback", "WASX7017E", "WASX7015E"];

/// Classifier for wsadmin output.
///
/// Recoverable signatures:
/// - `invalid parent config id`: the parent object (node, cluster, provider)
///   has not been created or synchronized yet
/// - `WASX7023E`: the deployment manager is not reachable
/// - `already exists`: someone else created the object since it was read
///
/// `allow` adds substrings that excuse a marked line.
pub fn classifier(allow: &[String]) -> Classifier {
    let mut classifier = Classifier::new()
        .recoverable(Signature::new(
            "invalid parent config id",
            RecoverableReason::DependencyNotReady,
            "The parent object does not exist yet. Make sure the node, cluster or \
             provider it belongs to is created and synchronized, then run again.",
        ))
        .recoverable(Signature::new(
            "WASX7023E",
            RecoverableReason::DependencyNotReady,
            "The deployment manager could not be reached. Start it (startManager.sh) \
             and run again.",
        ))
        .recoverable(Signature::new(
            "already exists",
            RecoverableReason::AlreadyExists,
            "The object was created outside of this run. The next run will read it \
             and reconcile its attributes.",
        ));

    for marker in ERROR_MARKERS {
        classifier = classifier.error_marker(marker);
    }
    for pattern in allow {
        classifier = classifier.allow(pattern);
    }
    classifier
}

/// Classifier with no extra allow-list entries
pub fn default_classifier() -> Classifier {
    classifier(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{Classification, CommandOutput, FatalReason};

    #[test]
    fn test_invalid_parent_is_dependency_not_ready() {
        let output = CommandOutput::failed(
            105,
            "WASX7015E: Error running command: com.ibm.websphere.management.exception.\
             ConfigServiceException: ADMG0007E: invalid parent config id for createClusterMember",
        );
        match default_classifier().classify(&output) {
            Classification::Recoverable { reason, hint } => {
                assert_eq!(reason, RecoverableReason::DependencyNotReady);
                assert!(hint.contains("synchronized"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_connection_banner_is_success() {
        let output = CommandOutput::ok(
            "WASX7209I: Connected to process \"dmgr\" on node DmgrNode01 using SOAP connector;  \
             The type of process is: DeploymentManager\n",
        );
        assert!(default_classifier().classify(&output).is_success());
    }

    #[test]
    fn test_exception_on_zero_exit_is_fatal() {
        let output = CommandOutput::ok("WASX7017E: Exception received while running file");
        assert!(matches!(
            default_classifier().classify(&output),
            Classification::Fatal(FatalReason::UnrecognizedOutput(_))
        ));
    }

    #[test]
    fn test_allow_list_excuses_known_noise() {
        let output = CommandOutput::ok("SSLHandshakeException ignored: trust store reloaded");
        let allow = vec!["trust store reloaded".to_string()];
        assert!(classifier(&allow).classify(&output).is_success());
    }
}
