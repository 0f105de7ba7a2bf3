use super::*;
use crate::dependencies::NOT_FOUND;
use crate::plugin::PluginDependency;
use crate::verification::*;
use crate::verifier::{
    CompatibilityProblem, DocumentedProblem, DocumentedProblemsFilter, ProblemType, VerificationError,
};
use tokio_util::sync::CancellationToken;

fn verify(plugin: &Arc<PluginDetails>, host: &HostDescriptor) -> VerificationReport {
    verify_with(PluginVerifier::new(VerifierParameters::default()), plugin, host)
}

fn verify_with(verifier: PluginVerifier, plugin: &Arc<PluginDetails>, host: &HostDescriptor) -> VerificationReport {
    verifier
        .verify(plugin, host, &LogReporter, &CancellationToken::new())
        .unwrap()
}

fn ranged(since: &str, until: &str) -> PluginDescriptor {
    PluginDescriptor::new("com.example.plugin", "1.0").with_range(
        Some(HostVersion::parse(since).unwrap()),
        Some(HostVersion::parse(until).unwrap()),
    )
}

#[test]
fn test_clean_plugin_is_ok() {
    let plugin = plugin(ranged("145", "146.*"), vec![main_class(false)]);
    let report = verify(&plugin, &host("146.999"));

    assert_eq!(report.verdict.kind(), VerdictKind::Ok);
    assert_eq!(report.plugin.id, "com.example.plugin");
    assert_eq!(report.host_version.to_string(), "146.999");
    assert_eq!(report.verdict.graph().unwrap().vertices.len(), 1);
}

#[test]
fn test_host_outside_range_warns() {
    let plugin = plugin(ranged("145", "146.*"), vec![main_class(false)]);
    let report = verify(&plugin, &host("147.0"));

    assert_eq!(report.verdict.kind(), VerdictKind::Warnings);
    assert!(matches!(
        report.verdict.warnings(),
        [PluginWarning::HostOutOfRange { .. }]
    ));
}

#[test]
fn test_missing_optional_module_keeps_problems() {
    let descriptor = PluginDescriptor::new("com.example.plugin", "1.0")
        .with_dependency(PluginDependency::module("com.foo").optional());
    let plugin = plugin(descriptor, vec![main_class(true)]);
    let report = verify(&plugin, &host("146.1"));

    match &report.verdict {
        Verdict::MissingDependencies { missing, problems, .. } => {
            assert_eq!(missing.len(), 1);
            assert_eq!(missing[0].dependency.id, "com.foo");
            assert_eq!(missing[0].reason, NOT_FOUND);
            assert_eq!(problems.len(), 1);
            assert_eq!(problems[0].problem_type(), ProblemType::MethodNotFound);
        }
        other => panic!("unexpected verdict {:?}", other),
    }
}

#[test]
fn test_host_module_dependency_needs_no_plugin() {
    let descriptor =
        PluginDescriptor::new("com.example.plugin", "1.0").with_dependency(PluginDependency::module("com.host.platform"));
    let plugin = plugin(descriptor, vec![main_class(false)]);
    let report = verify(&plugin, &host("146.1").with_module("com.host.platform"));

    assert_eq!(report.verdict.kind(), VerdictKind::Ok);
}

#[test]
fn test_bundled_dependency_joins_classpath() {
    let api = ClassFile::new("bundled/Api").with_method(MethodInfo::new("call", "()V", AccessFlags::PUBLIC));
    let bundled = PluginDetails::new(
        PluginDescriptor::new("com.host.java", "146.1")
            .with_module("com.host.modules.java")
            .with_dependency(PluginDependency::plugin("com.host.gone")),
        Arc::new(FixedClassesResolver::from_classes("bundled", vec![api])),
    );
    let host = host("146.1").with_bundled_plugin(bundled);

    let caller = ClassFile::new("plugin/UsesBundled").with_method(
        MethodInfo::new("work", "()V", AccessFlags::PUBLIC).with_instruction(Instruction::method(
            0,
            InstructionKind::InvokeVirtual,
            MethodReference::new("bundled/Api", "call", "()V"),
        )),
    );
    let descriptor = PluginDescriptor::new("com.example.plugin", "1.0")
        .with_dependency(PluginDependency::module("com.host.modules.java"));
    let report = verify(&plugin(descriptor, vec![caller]), &host);

    // the bundled plugin's own missing dependency is only a warning
    assert_eq!(report.verdict.kind(), VerdictKind::Warnings);
    let graph = report.verdict.graph().unwrap();
    assert_eq!(graph.vertices.len(), 2);
    assert_eq!(graph.edges.len(), 1);
    assert!(matches!(
        report.verdict.warnings(),
        [PluginWarning::MissingTransitiveDependency { plugin, .. }] if plugin.id == "com.host.java"
    ));
}

#[test]
fn test_documented_problem_goes_to_ignored() {
    let filter = DocumentedProblemsFilter::new(vec![DocumentedProblem::MethodRemoved {
        owner: "host.Service".into(),
        name: "removed".into(),
    }]);
    let verifier = PluginVerifier::new(VerifierParameters {
        filters: vec![Arc::new(filter)],
        ..Default::default()
    });
    let plugin = plugin(PluginDescriptor::new("com.example.plugin", "1.0"), vec![main_class(true)]);
    let report = verify_with(verifier, &plugin, &host("146.1"));

    assert_eq!(report.verdict.kind(), VerdictKind::Ok);
    assert_eq!(report.ignored.len(), 1);
    assert_eq!(report.ignored[0].filter, "documented");
}

#[test]
fn test_extra_classpath_resolves_references() {
    let plugin = plugin(PluginDescriptor::new("com.example.plugin", "1.0"), vec![main_class(true)]);
    let extra = ClassFile::new("host/Service")
        .with_method(MethodInfo::new("removed", "()V", AccessFlags::PUBLIC));
    let shadowed = verify_with(
        PluginVerifier::new(VerifierParameters {
            extra_classpath: vec![Arc::new(FixedClassesResolver::from_classes("extra", vec![extra]))],
            ..Default::default()
        }),
        &plugin,
        &host("146.1"),
    );

    // host classes come first, so the extra copy does not hide the problem
    assert_eq!(shadowed.verdict.kind(), VerdictKind::Problems);
}

#[test]
fn test_reporters_receive_events() {
    let collecting = Arc::new(CollectingReporter::new());
    let (channel, events) = ChannelReporter::unbounded();
    let reporters = ReporterSet::new().with(collecting.clone()).with(Arc::new(channel));
    assert_eq!(reporters.len(), 2);

    let plugin = plugin(PluginDescriptor::new("com.example.plugin", "1.0"), vec![main_class(true)]);
    let report = PluginVerifier::new(VerifierParameters::default())
        .verify(&plugin, &host("146.1"), &reporters, &CancellationToken::new())
        .unwrap();

    assert_eq!(collecting.reports(), vec![report]);
    assert_eq!(collecting.problems().len(), 1);
    assert!(matches!(collecting.problems()[0], CompatibilityProblem::MethodNotFound { .. }));
    assert_eq!(collecting.last_progress(), 1.0);
    assert!(!collecting.messages().is_empty());

    let received: Vec<ReportEvent> = events.try_iter().collect();
    assert!(matches!(received.first(), Some(ReportEvent::Message(_))));
    assert!(matches!(received.last(), Some(ReportEvent::Verdict(_))));
    assert!(received.iter().any(|e| matches!(e, ReportEvent::Graph(_))));
}

#[test]
fn test_cancelled_verification() {
    let token = CancellationToken::new();
    token.cancel();
    let plugin = plugin(PluginDescriptor::new("com.example.plugin", "1.0"), vec![main_class(false)]);
    let outcome = PluginVerifier::new(VerifierParameters::default()).verify(&plugin, &host("146.1"), &LogReporter, &token);

    assert_eq!(outcome.unwrap_err(), VerificationError::Cancelled);
}
