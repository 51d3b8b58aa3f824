use classkit::{Args, AttributeSpec, CompositionError, Engine, RoleSpec, Value};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn missing_requirement_names_the_behavior() {
    let mut engine = Engine::new();
    engine.declare_type("Plain");
    engine.declare_role("Comparable");
    engine.require_behaviors("Comparable", &["compare"]).unwrap();

    let err = engine.apply_role_now("Plain", "Comparable").unwrap_err();
    match err {
        CompositionError::MissingRequiredBehavior { role, missing, .. } => {
            assert_eq!(role, "Comparable");
            assert_eq!(missing, vec!["compare"]);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn requirement_satisfied_by_the_type_itself() {
    let mut engine = Engine::new();
    engine.declare_type("Number");
    engine
        .define_behavior("Number", "compare", |_, _| Ok(Value::Int(0)))
        .unwrap();
    engine.declare_role("Comparable");
    engine.require_behaviors("Comparable", &["compare"]).unwrap();
    engine
        .provide_behavior("Comparable", "equals", |_, _| Ok(Value::Bool(true)))
        .unwrap();

    engine.apply_role_now("Number", "Comparable").unwrap();
    let mut n = engine.construct("Number", Args::new()).unwrap();
    assert_eq!(engine.invoke(&mut n, "compare", &[]).unwrap(), Value::Int(0));
    assert_eq!(
        engine.invoke(&mut n, "equals", &[]).unwrap(),
        Value::Bool(true)
    );
}

#[test]
fn requirement_satisfied_by_another_role_in_the_batch() {
    let mut engine = Engine::new();
    engine.declare_type("T");
    engine.declare_role("Needs");
    engine.require_behaviors("Needs", &["helper"]).unwrap();
    engine.declare_role("Gives");
    engine
        .provide_behavior("Gives", "helper", |_, _| Ok(Value::Nil))
        .unwrap();

    engine
        .apply_roles("T", &[RoleSpec::named("Needs"), RoleSpec::named("Gives")])
        .unwrap();
    assert_eq!(engine.applied_roles("T").unwrap(), vec!["Needs", "Gives"]);
}

#[test]
fn plain_conflict_names_behavior_and_sorted_roles() {
    let mut engine = Engine::new();
    engine.declare_type("T");
    for role in ["Zeta", "Alpha"] {
        engine.declare_role(role);
        engine
            .provide_behavior(role, "m", |_, _| Ok(Value::Nil))
            .unwrap();
    }
    let err = engine
        .apply_roles("T", &[RoleSpec::named("Zeta"), RoleSpec::named("Alpha")])
        .unwrap_err();
    match err {
        CompositionError::BehaviorConflict {
            behavior,
            first_role,
            second_role,
            ..
        } => {
            assert_eq!(behavior, "m");
            assert_eq!(first_role, "Alpha");
            assert_eq!(second_role, "Zeta");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn type_defining_the_behavior_dissolves_the_conflict() {
    let mut engine = Engine::new();
    engine.declare_type("T");
    engine
        .define_behavior("T", "m", |_, _| Ok(Value::Str("mine".into())))
        .unwrap();
    for role in ["Ra", "Rb"] {
        engine.declare_role(role);
        engine
            .provide_behavior(role, "m", |_, _| Ok(Value::Str("theirs".into())))
            .unwrap();
    }
    engine
        .apply_roles("T", &[RoleSpec::named("Ra"), RoleSpec::named("Rb")])
        .unwrap();
    let mut t = engine.construct("T", Args::new()).unwrap();
    assert_eq!(
        engine.invoke(&mut t, "m", &[]).unwrap(),
        Value::Str("mine".into())
    );
}

#[test]
fn aliasing_resolves_a_conflict() {
    let mut engine = Engine::new();
    engine.declare_type("Logger");
    engine.declare_role("FileLog");
    engine
        .provide_behavior("FileLog", "log", |_, _| Ok(Value::Str("file".into())))
        .unwrap();
    engine.declare_role("DebugLog");
    engine
        .provide_behavior("DebugLog", "log", |_, _| Ok(Value::Str("debug".into())))
        .unwrap();

    engine
        .apply_roles(
            "Logger",
            &[
                RoleSpec::named("FileLog").with_alias("log", "file_log"),
                RoleSpec::named("DebugLog").with_alias("log", "debug_log"),
            ],
        )
        .unwrap();

    let mut logger = engine.construct("Logger", Args::new()).unwrap();
    assert_eq!(
        engine.invoke(&mut logger, "file_log", &[]).unwrap(),
        Value::Str("file".into())
    );
    assert_eq!(
        engine.invoke(&mut logger, "debug_log", &[]).unwrap(),
        Value::Str("debug".into())
    );
}

#[test]
fn alias_collision_is_reported_distinctly() {
    let mut engine = Engine::new();
    engine.declare_type("T");
    engine.declare_role("Ra");
    engine
        .provide_behavior("Ra", "save", |_, _| Ok(Value::Nil))
        .unwrap();
    engine.declare_role("Rb");
    engine
        .provide_behavior("Rb", "store", |_, _| Ok(Value::Nil))
        .unwrap();

    let err = engine
        .apply_roles(
            "T",
            &[
                RoleSpec::named("Ra"),
                RoleSpec::named("Rb").with_alias("store", "save"),
            ],
        )
        .unwrap_err();
    match err {
        CompositionError::AliasedBehaviorConflict {
            provided,
            installed,
            first_role,
            second_role,
            ..
        } => {
            assert_eq!(provided, "store");
            assert_eq!(installed, "save");
            assert_eq!(first_role, "Ra");
            assert_eq!(second_role, "Rb");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn exclusion_is_fatal_in_both_directions() {
    let mut engine = Engine::new();
    engine.declare_type("T");
    engine.declare_role("Strict");
    engine.declare_role("Loose");
    engine.exclude_roles("Strict", &["Loose"]).unwrap();

    // Excluded role applied first, excluder second.
    engine.apply_role_now("T", "Loose").unwrap();
    let err = engine.apply_role_now("T", "Strict").unwrap_err();
    assert!(matches!(
        err,
        CompositionError::RoleExclusionViolation { ref first_role, ref second_role, .. }
            if first_role == "Loose" && second_role == "Strict"
    ));

    // Excluder applied first, excluded second.
    engine.declare_type("U");
    engine.apply_role_now("U", "Strict").unwrap();
    let err = engine.apply_role_now("U", "Loose").unwrap_err();
    assert!(matches!(
        err,
        CompositionError::RoleExclusionViolation { .. }
    ));

    // Both in one batch.
    engine.declare_type("V");
    let err = engine
        .apply_roles("V", &[RoleSpec::named("Strict"), RoleSpec::named("Loose")])
        .unwrap_err();
    assert!(matches!(
        err,
        CompositionError::RoleExclusionViolation { .. }
    ));
}

#[test]
fn does_reflects_application_history() {
    let mut engine = Engine::new();
    engine.declare_type("Base");
    engine.declare_type("Child");
    engine.add_parent("Child", &["Base"]).unwrap();
    engine.declare_role("Seen");
    engine.declare_role("Unseen");

    assert!(!engine.does("Child", "Seen").unwrap());
    engine.apply_role_now("Base", "Seen").unwrap();
    assert!(engine.does("Base", "Seen").unwrap());
    assert!(engine.does("Child", "Seen").unwrap());
    assert!(!engine.does("Child", "Unseen").unwrap());

    let child = engine.construct("Child", Args::new()).unwrap();
    assert!(engine.instance_does(&child, "Seen").unwrap());
}

#[test]
fn consumed_roles_count_for_does() {
    let mut engine = Engine::new();
    engine.declare_type("T");
    engine.declare_role("Outer");
    engine.declare_role("Inner");
    engine
        .provide_behavior("Inner", "inner_thing", |_, _| Ok(Value::Nil))
        .unwrap();
    engine.consume("Outer", &["Inner"]).unwrap();

    engine.apply_role_now("T", "Outer").unwrap();
    assert!(engine.does("T", "Outer").unwrap());
    assert!(engine.does("T", "Inner").unwrap());
    let mut t = engine.construct("T", Args::new()).unwrap();
    assert_eq!(engine.invoke(&mut t, "inner_thing", &[]).unwrap(), Value::Nil);
}

#[test]
fn roles_sharing_a_consumed_role_do_not_conflict() {
    let mut engine = Engine::new();
    engine.declare_type("T");
    engine.declare_role("Common");
    engine
        .provide_behavior("Common", "shared_m", |_, _| Ok(Value::Int(1)))
        .unwrap();
    engine.declare_role("Ra");
    engine.declare_role("Rb");
    engine.consume("Ra", &["Common"]).unwrap();
    engine.consume("Rb", &["Common"]).unwrap();

    engine.apply_role_now("T", "Ra").unwrap();
    engine.apply_role_now("T", "Rb").unwrap();
    assert_eq!(
        engine.applied_roles("T").unwrap(),
        vec!["Ra", "Common", "Rb"]
    );
    let mut t = engine.construct("T", Args::new()).unwrap();
    assert_eq!(
        engine.invoke(&mut t, "shared_m", &[]).unwrap(),
        Value::Int(1)
    );

    // The same pair in one batch composes just as cleanly.
    engine.declare_type("U");
    engine
        .apply_roles("U", &[RoleSpec::named("Ra"), RoleSpec::named("Rb")])
        .unwrap();
    let mut u = engine.construct("U", Args::new()).unwrap();
    assert_eq!(
        engine.invoke(&mut u, "shared_m", &[]).unwrap(),
        Value::Int(1)
    );
}

#[test]
fn role_attributes_merge_without_displacing_own() {
    let mut engine = Engine::new();
    engine.declare_type("T");
    engine
        .declare_attribute("T", "shared", AttributeSpec::new().with_default(Value::Int(1)))
        .unwrap();
    engine.declare_role("Carrier");
    engine
        .declare_role_attribute(
            "Carrier",
            "shared",
            AttributeSpec::new().with_default(Value::Int(99)),
        )
        .unwrap();
    engine
        .declare_role_attribute(
            "Carrier",
            "extra",
            AttributeSpec::new().with_default(Value::Int(7)),
        )
        .unwrap();

    engine.apply_role_now("T", "Carrier").unwrap();
    let t = engine.construct("T", Args::new()).unwrap();
    assert_eq!(t.get("shared"), Some(&Value::Int(1)));
    assert_eq!(t.get("extra"), Some(&Value::Int(7)));
}

#[test]
fn attribute_incapable_type_drops_role_attributes() {
    init_tracing();
    let mut engine = Engine::new();
    engine.declare_type_without_attributes("Opaque");
    engine.declare_role("Carrier");
    engine
        .declare_role_attribute(
            "Carrier",
            "extra",
            AttributeSpec::new().with_default(Value::Int(7)),
        )
        .unwrap();
    engine
        .provide_behavior("Carrier", "poke", |_, _| Ok(Value::Nil))
        .unwrap();

    // Non-fatal: the role still composes, only its attributes drop.
    engine.apply_role_now("Opaque", "Carrier").unwrap();
    assert!(engine.does("Opaque", "Carrier").unwrap());
    let opaque = engine.construct("Opaque", Args::new()).unwrap();
    assert_eq!(opaque.get("extra"), None);
}

#[test]
fn reapplication_does_not_duplicate_history() {
    init_tracing();
    let mut engine = Engine::new();
    engine.declare_type("T");
    engine.declare_role("R");
    engine.apply_role_now("T", "R").unwrap();
    engine.apply_role_now("T", "R").unwrap();
    engine.apply_roles("T", &[RoleSpec::named("R")]).unwrap();
    assert_eq!(engine.applied_roles("T").unwrap(), vec!["R"]);
}

#[test]
fn runtime_application_matches_declaration_time() {
    let mut engine = Engine::new();
    engine.declare_type("T");
    engine.declare_role("Late");
    engine
        .provide_behavior("Late", "ping", |_, _| Ok(Value::Str("pong".into())))
        .unwrap();

    let mut t = engine.construct("T", Args::new()).unwrap();
    assert!(engine.invoke(&mut t, "ping", &[]).is_err());

    engine.apply_role_now("T", "Late").unwrap();
    assert_eq!(
        engine.invoke(&mut t, "ping", &[]).unwrap(),
        Value::Str("pong".into())
    );
}
