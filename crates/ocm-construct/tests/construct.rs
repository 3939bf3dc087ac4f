mod support;

use std::sync::Arc;

use ocm_construct::{construct, ConflictPolicy, ConstructError, ConstructOptions, ExternalCopyPolicy};
use ocm_spec::{
    Access, Component, ComponentConstructor, CopyPolicy, ElementMeta, Input, Reference, Relation,
    Resource,
};
use support::{
    EchoInputMethod, FixedDigestProcessor, InMemoryExternalRepository, InMemoryTargetRepository,
    NoCredentials, NoResourceRepositories,
};

fn echo_input(payload: &str) -> Input {
    Input::new(serde_json::json!({"type": "test/v1", "payload": payload}))
}

fn meta(name: &str) -> ElementMeta {
    ElementMeta {
        name: name.to_string(),
        ..Default::default()
    }
}

fn resource_with_input(name: &str, payload: &str) -> Resource {
    Resource {
        meta: meta(name),
        type_: "blob".to_string(),
        relation: None,
        copy_policy: None,
        access: None,
        input: Some(echo_input(payload)),
    }
}

fn component(name: &str, version: &str, resources: Vec<Resource>, references: Vec<Reference>) -> Component {
    Component {
        name: name.to_string(),
        version: version.to_string(),
        provider: Some("ocm.software/test-suite".to_string()),
        labels: Vec::new(),
        resources,
        sources: Vec::new(),
        references,
        creation_time: None,
    }
}

fn reference(name: &str, target: &str, version: &str) -> Reference {
    Reference {
        meta: meta(name),
        component: target.to_string(),
        version: version.to_string(),
    }
}

fn options(target: Arc<InMemoryTargetRepository>) -> ConstructOptions {
    ConstructOptions::builder(target)
        .resource_input_method(Arc::new(EchoInputMethod::new()))
        .source_input_method(Arc::new(EchoInputMethod::new()))
        .digest_processor(Arc::new(FixedDigestProcessor))
        .credentials(Arc::new(NoCredentials))
        .build()
}

#[tokio::test]
async fn builds_a_single_component_with_one_resource() {
    let target = Arc::new(InMemoryTargetRepository::new());
    let doc = ComponentConstructor::new(vec![component(
        "ocm.software/app",
        "v1.0.0",
        vec![resource_with_input("binary", "hello")],
        Vec::new(),
    )]);

    let built = construct(doc, options(Arc::clone(&target))).await.unwrap();

    assert_eq!(built.len(), 1);
    let descriptor = &built[0];
    assert_eq!(descriptor.name, "ocm.software/app");
    assert_eq!(descriptor.resources.len(), 1);
    assert!(descriptor.resources[0].access.is_local_blob());
    assert_eq!(descriptor.resources[0].relation, Relation::Local);
    assert_eq!(target.component_count(), 1);
}

#[tokio::test]
async fn abort_and_fail_rejects_a_second_build_of_the_same_version() {
    let target = Arc::new(InMemoryTargetRepository::new());
    let doc = || {
        ComponentConstructor::new(vec![component(
            "ocm.software/app",
            "v1.0.0",
            vec![resource_with_input("binary", "hello")],
            Vec::new(),
        )])
    };

    construct(doc(), options(Arc::clone(&target))).await.unwrap();
    let err = construct(doc(), options(Arc::clone(&target))).await.unwrap_err();
    assert!(matches!(err, ConstructError::AlreadyExists { .. }));
}

#[tokio::test]
async fn skip_policy_returns_the_existing_descriptor_without_reprocessing() {
    let target = Arc::new(InMemoryTargetRepository::new());
    let doc = || {
        ComponentConstructor::new(vec![component(
            "ocm.software/app",
            "v1.0.0",
            vec![resource_with_input("binary", "hello")],
            Vec::new(),
        )])
    };

    let first = construct(doc(), options(Arc::clone(&target))).await.unwrap();
    let opts = ConstructOptions::builder(Arc::clone(&target))
        .resource_input_method(Arc::new(EchoInputMethod::new()))
        .conflict_policy(ConflictPolicy::Skip)
        .build();
    let second = construct(doc(), opts).await.unwrap();

    assert_eq!(first[0], second[0]);
    assert_eq!(target.component_count(), 1);
}

#[tokio::test]
async fn replace_policy_rebuilds_an_existing_version() {
    let target = Arc::new(InMemoryTargetRepository::new());
    construct(
        ComponentConstructor::new(vec![component(
            "ocm.software/app",
            "v1.0.0",
            vec![resource_with_input("binary", "hello")],
            Vec::new(),
        )]),
        options(Arc::clone(&target)),
    )
    .await
    .unwrap();

    let opts = ConstructOptions::builder(Arc::clone(&target))
        .resource_input_method(Arc::new(EchoInputMethod::new()))
        .conflict_policy(ConflictPolicy::Replace)
        .build();
    let rebuilt = construct(
        ComponentConstructor::new(vec![component(
            "ocm.software/app",
            "v1.0.0",
            vec![resource_with_input("binary", "goodbye")],
            Vec::new(),
        )]),
        opts,
    )
    .await
    .unwrap();

    assert_eq!(target.component_count(), 1);
    assert_eq!(rebuilt[0].resources.len(), 1);
}

#[tokio::test]
async fn diamond_references_carry_a_digest_for_each_shared_dependency() {
    let target = Arc::new(InMemoryTargetRepository::new());
    let doc = ComponentConstructor::new(vec![
        component(
            "ocm.software/root",
            "v1.0.0",
            Vec::new(),
            vec![
                reference("mid-a", "ocm.software/mid-a", "v1.0.0"),
                reference("mid-b", "ocm.software/mid-b", "v1.0.0"),
            ],
        ),
        component(
            "ocm.software/mid-a",
            "v1.0.0",
            Vec::new(),
            vec![reference("leaf", "ocm.software/leaf", "v1.0.0")],
        ),
        component(
            "ocm.software/mid-b",
            "v1.0.0",
            Vec::new(),
            vec![reference("leaf", "ocm.software/leaf", "v1.0.0")],
        ),
        component("ocm.software/leaf", "v1.0.0", Vec::new(), Vec::new()),
    ]);

    let built = construct(doc, options(Arc::clone(&target))).await.unwrap();

    let root = built.iter().find(|d| d.name == "ocm.software/root").unwrap();
    assert_eq!(root.references.len(), 2);
    for reference in &root.references {
        assert!(reference.digest.is_some());
    }
    let mid_a = built.iter().find(|d| d.name == "ocm.software/mid-a").unwrap();
    let mid_b = built.iter().find(|d| d.name == "ocm.software/mid-b").unwrap();
    assert_eq!(
        mid_a.references[0].digest.as_ref().unwrap().value,
        mid_b.references[0].digest.as_ref().unwrap().value,
        "both parents reference the same leaf content, so the digest must match"
    );
}

#[tokio::test]
async fn reference_cycles_are_rejected_before_any_work_starts() {
    let target = Arc::new(InMemoryTargetRepository::new());
    let doc = ComponentConstructor::new(vec![
        component(
            "ocm.software/a",
            "v1.0.0",
            Vec::new(),
            vec![reference("b", "ocm.software/b", "v1.0.0")],
        ),
        component(
            "ocm.software/b",
            "v1.0.0",
            Vec::new(),
            vec![reference("a", "ocm.software/a", "v1.0.0")],
        ),
    ]);

    let err = construct(doc, options(target)).await.unwrap_err();
    assert!(matches!(err, ConstructError::CycleDetected { .. }));
}

#[tokio::test]
async fn one_failing_resource_fails_the_whole_component_and_nothing_is_uploaded() {
    let target = Arc::new(InMemoryTargetRepository::new());
    let opts = ConstructOptions::builder(Arc::clone(&target))
        .resource_input_method(Arc::new(EchoInputMethod::failing()))
        .build();
    let doc = ComponentConstructor::new(vec![component(
        "ocm.software/app",
        "v1.0.0",
        vec![
            resource_with_input("binary", "hello"),
            resource_with_input("docs", "world"),
        ],
        Vec::new(),
    )]);

    let err = construct(doc, opts).await.unwrap_err();
    assert!(matches!(err, ConstructError::InputMethodFailed { .. }));
    assert_eq!(target.component_count(), 0);
}

#[tokio::test]
async fn unresolvable_input_kind_is_reported_with_the_element_identity() {
    let target = Arc::new(InMemoryTargetRepository::new());
    let opts = ConstructOptions::builder(Arc::clone(&target)).build();
    let doc = ComponentConstructor::new(vec![component(
        "ocm.software/app",
        "v1.0.0",
        vec![resource_with_input("binary", "hello")],
        Vec::new(),
    )]);

    let err = construct(doc, opts).await.unwrap_err();
    match err {
        ConstructError::UnresolvableInputMethod { component, element, kind } => {
            assert_eq!(component, "name=ocm.software/app,version=v1.0.0");
            assert_eq!(element, "binary");
            assert_eq!(kind, "test/v1");
        }
        other => panic!("expected UnresolvableInputMethod, got {other:?}"),
    }
}

#[tokio::test]
async fn by_value_copy_without_a_resource_repository_honours_skip_policy() {
    let target = Arc::new(InMemoryTargetRepository::new());
    let access = Access::new(serde_json::json!({"type": "ociArtifact/v1", "imageReference": "example.com/app:v1"}));
    let resource = Resource {
        meta: meta("image"),
        type_: "ociImage".to_string(),
        relation: Some(Relation::External),
        copy_policy: Some(CopyPolicy::ByValue),
        access: Some(access),
        input: None,
    };
    let opts = ConstructOptions::builder(Arc::clone(&target))
        .resource_repository(Arc::new(NoResourceRepositories))
        .digest_processor(Arc::new(FixedDigestProcessor))
        .external_copy_policy(ExternalCopyPolicy::Skip)
        .build();

    let built = construct(
        ComponentConstructor::new(vec![component("ocm.software/app", "v1.0.0", vec![resource], Vec::new())]),
        opts,
    )
    .await
    .unwrap();

    assert_eq!(built[0].resources[0].relation, Relation::External);
    assert!(!built[0].resources[0].access.is_local_blob());
    assert!(built[0].resources[0].digest.is_some());
}

#[tokio::test]
async fn by_value_copy_without_a_resource_repository_honours_copy_or_fail_policy() {
    let target = Arc::new(InMemoryTargetRepository::new());
    let access = Access::new(serde_json::json!({"type": "ociArtifact/v1", "imageReference": "example.com/app:v1"}));
    let resource = Resource {
        meta: meta("image"),
        type_: "ociImage".to_string(),
        relation: Some(Relation::External),
        copy_policy: Some(CopyPolicy::ByValue),
        access: Some(access),
        input: None,
    };
    let opts = ConstructOptions::builder(Arc::clone(&target))
        .resource_repository(Arc::new(NoResourceRepositories))
        .external_copy_policy(ExternalCopyPolicy::CopyOrFail)
        .build();

    let err = construct(
        ComponentConstructor::new(vec![component("ocm.software/app", "v1.0.0", vec![resource], Vec::new())]),
        opts,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ConstructError::NoResourceRepository { .. }));
}

#[tokio::test]
async fn an_unknown_external_reference_target_is_reported_as_not_found() {
    let target = Arc::new(InMemoryTargetRepository::new());
    let doc = ComponentConstructor::new(vec![component(
        "ocm.software/app",
        "v1.0.0",
        Vec::new(),
        vec![reference("dep", "ocm.software/missing", "v1.0.0")],
    )]);

    let err = construct(doc, options(target)).await.unwrap_err();
    assert!(matches!(err, ConstructError::NotFound { .. }));
}

#[tokio::test]
async fn an_external_reference_resolved_from_the_external_repository_succeeds() {
    let target = Arc::new(InMemoryTargetRepository::new());
    let external_target = Arc::new(InMemoryTargetRepository::new());
    let dep = construct(
        ComponentConstructor::new(vec![component("ocm.software/dep", "v1.0.0", Vec::new(), Vec::new())]),
        options(Arc::clone(&external_target)),
    )
    .await
    .unwrap()
    .remove(0);

    let external = Arc::new(InMemoryExternalRepository::new().with(dep));
    let opts = ConstructOptions::builder(Arc::clone(&target))
        .external_components(external)
        .build();
    let doc = ComponentConstructor::new(vec![component(
        "ocm.software/app",
        "v1.0.0",
        Vec::new(),
        vec![reference("dep", "ocm.software/dep", "v1.0.0")],
    )]);

    let built = construct(doc, opts).await.unwrap();
    assert_eq!(built[0].references.len(), 1);
    assert!(built[0].references[0].digest.is_some());
}

#[tokio::test]
async fn a_by_reference_resource_with_no_explicit_relation_defaults_to_external() {
    let target = Arc::new(InMemoryTargetRepository::new());
    let access = Access::new(serde_json::json!({"type": "ociArtifact/v1", "imageReference": "example.com/app:v1"}));
    let resource = Resource {
        meta: meta("image"),
        type_: "ociImage".to_string(),
        relation: None,
        copy_policy: None,
        access: Some(access),
        input: None,
    };
    let doc = ComponentConstructor::new(vec![component("ocm.software/app", "v1.0.0", vec![resource], Vec::new())]);
    let opts = ConstructOptions::builder(Arc::clone(&target))
        .digest_processor(Arc::new(FixedDigestProcessor))
        .build();

    let built = construct(doc, opts).await.unwrap();
    assert_eq!(built[0].resources[0].relation, Relation::External);
}

#[tokio::test]
async fn an_element_without_an_explicit_version_inherits_the_component_version() {
    let target = Arc::new(InMemoryTargetRepository::new());
    let doc = ComponentConstructor::new(vec![component(
        "ocm.software/app",
        "v1.0.0",
        vec![resource_with_input("binary", "hello")],
        Vec::new(),
    )]);

    let built = construct(doc, options(Arc::clone(&target))).await.unwrap();
    assert_eq!(built[0].resources[0].meta.version.as_deref(), Some("v1.0.0"));
}
