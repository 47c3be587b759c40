use std::sync::Arc;

use goldcheck::{
    assert_matches,
    diagnostics::{DiagResult, SourceFile},
};
use goldcheck_filecheck as filecheck;

use filecheck::{CheckFailedError, Config, Stage, Test, VerifyError};

const SANITY_CHECKS: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../tests/sanity/check.txt"
));
const SANITY_INPUT: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../tests/sanity/input.txt"
));

const PTRAUTH_CHECKS: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../tests/ptrauth/check.txt"
));
const PTRAUTH_INPUT: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../tests/ptrauth/input.ll"
));

const PRESPECIALIZED_CHECKS: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../tests/prespecialized/check.txt"
));
const PRESPECIALIZED_INPUT: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../tests/prespecialized/input.ll"
));

fn file(name: &'static str, content: &str) -> Arc<SourceFile> {
    Arc::new(SourceFile::new(name, content.to_string()))
}

#[test]
fn integration_test_sanity() -> DiagResult<()> {
    let config = Config::default();
    let test = Test::new(file("sanity/check.txt", SANITY_CHECKS), &config);
    let result = test.verify(file("sanity/input.txt", SANITY_INPUT))?;

    assert_eq!(result.num_directives(), 12);
    assert_eq!(result.num_passed(), 12);
    assert_eq!(result.labels().len(), 2);

    Ok(())
}

#[test]
fn integration_test_sanity_check_next_violation() {
    let input = SANITY_INPUT.replace("  ret v2\n}\n\nfn main", "  v3 = copy v2\n  ret v2\n}\n\nfn main");
    let config = Config::default();
    let test = Test::new(file("sanity/check.txt", SANITY_CHECKS), &config);
    let err = test.verify(file("sanity/input.txt", &input)).unwrap_err();

    assert_eq!(err.stage(), Stage::Match);
    assert_matches!(
        err.failure(),
        Some(CheckFailedError::MatchFoundButWrongLine { index: 5, .. })
    );
}

#[test]
fn integration_test_sanity_check_not_violation() {
    let input = SANITY_INPUT.replace("  v2 = add v0, v1", "  call trace\n  v2 = add v0, v1");
    let config = Config::default();
    let test = Test::new(file("sanity/check.txt", SANITY_CHECKS), &config);
    let err = test.verify(file("sanity/input.txt", &input)).unwrap_err();

    assert_matches!(
        err.failure(),
        Some(CheckFailedError::MatchFoundButExcluded { index: 3, .. })
    );
}

#[test]
fn integration_test_ptrauth_field_function_pointers() -> DiagResult<()> {
    let config = Config::default();
    let test = Test::new(file("ptrauth/check.txt", PTRAUTH_CHECKS), &config);
    let result = test.verify(file("ptrauth/input.ll", PTRAUTH_INPUT))?;

    assert_eq!(result.num_directives(), 34);
    assert_eq!(result.num_passed(), 34);

    let labels = result.labels();
    assert_eq!(labels.len(), 1);
    assert_eq!(
        labels[0].span.start,
        PTRAUTH_INPUT.find("define hidden swiftcc void").unwrap()
    );

    // `[[LD:%.*]]` is bound twice, once in each function
    let ld = result
        .matches_in_file_order()
        .into_iter()
        .flat_map(|info| info.captures.iter())
        .filter(|capture| &*capture.name == "LD")
        .map(|capture| &PTRAUTH_INPUT[capture.range.clone()])
        .collect::<Vec<_>>();
    assert_eq!(ld, vec!["%0", "%16"]);

    Ok(())
}

#[test]
fn integration_test_ptrauth_wrong_resign_key() {
    let input = PTRAUTH_INPUT.replace(
        "@llvm.ptrauth.resign(i64 %17, i32 0, i64 0, i32 1, i64 88)",
        "@llvm.ptrauth.resign(i64 %17, i32 0, i64 0, i32 2, i64 88)",
    );
    let config = Config::default();
    let test = Test::new(file("ptrauth/check.txt", PTRAUTH_CHECKS), &config);
    let err = test.verify(file("ptrauth/input.ll", &input)).unwrap_err();

    assert_matches!(
        err.failure(),
        Some(CheckFailedError::MatchNoneButExpected { index: 28, .. })
    );
}

#[test]
fn integration_test_prespecialized_metadata_apple() -> DiagResult<()> {
    let config = Config::default()
        .with_check_prefixes(["CHECK", "CHECK-apple"])
        .define("INT", "i64")
        .define("ALIGNMENT", "8");
    let test = Test::new(
        file("prespecialized/check.txt", PRESPECIALIZED_CHECKS),
        &config,
    );
    let result = test.verify(file("prespecialized/input.ll", PRESPECIALIZED_INPUT))?;

    assert_eq!(result.num_passed(), 19);

    let unique_id = result
        .matches()
        .iter()
        .flat_map(|info| info.captures.iter())
        .find(|capture| &*capture.name == "UNIQUE_ID_1")
        .map(|capture| &PRESPECIALIZED_INPUT[capture.range.clone()]);
    assert_eq!(unique_id, Some("LL"));

    // both DAG matches precede the metadata record
    let value = PRESPECIALIZED_INPUT.find("@\"$s4main5Value").unwrap();
    assert!(result
        .matches()
        .iter()
        .filter(|info| info.index < 2)
        .all(|info| info.span.end < value));

    Ok(())
}

#[test]
fn integration_test_prespecialized_metadata_unknown() {
    let config = Config::default()
        .with_check_prefixes(["CHECK", "CHECK-unknown"])
        .define("INT", "i64")
        .define("ALIGNMENT", "8");
    let test = Test::new(
        file("prespecialized/check.txt", PRESPECIALIZED_CHECKS),
        &config,
    );
    let err = test
        .verify(file("prespecialized/input.ll", PRESPECIALIZED_INPUT))
        .unwrap_err();

    // the record is a `global` on apple platforms, not a `constant`
    assert_eq!(err.stage(), Stage::Match);
    assert_matches!(
        err.failure(),
        Some(CheckFailedError::MatchNoneButExpected { index: 3, .. })
    );
}

#[test]
fn integration_test_prespecialized_metadata_requires_definitions() {
    let config = Config::default().with_check_prefixes(["CHECK", "CHECK-apple"]);
    let test = Test::new(
        file("prespecialized/check.txt", PRESPECIALIZED_CHECKS),
        &config,
    );
    let err = test
        .verify(file("prespecialized/input.ll", PRESPECIALIZED_INPUT))
        .unwrap_err();

    assert_eq!(err.stage(), Stage::Compile);
    assert_matches!(err, VerifyError::Pattern { .. });
}
