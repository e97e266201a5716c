use modernizer_cli::{resolve_config, run, Options};
use modernizer_ir::{validate, ProjectIR};
use modernizer_test_utils::{CALC_FILENAME, CALC_SOURCE};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;

fn offline_options(input: &Path, out: &Path) -> Options {
    Options {
        paths: vec![input.to_path_buf()],
        out: out.to_path_buf(),
        offline: true,
        ..Options::default()
    }
}

#[tokio::test]
async fn offline_run_writes_tree() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    fs::create_dir_all(input.path().join("legacy")).unwrap();
    fs::write(input.path().join(CALC_FILENAME), CALC_SOURCE).unwrap();
    fs::write(
        input.path().join("legacy/Order.java"),
        "import java.util.Vector;\npublic class Order {}\n",
    )
    .unwrap();
    fs::write(input.path().join("README.txt"), "not source").unwrap();

    let options = offline_options(input.path(), out.path());
    let (config, key) = resolve_config(&options, |_| None).unwrap();
    let summary = run(&options, config, key.as_deref()).await.unwrap();

    assert_eq!(summary.units, 2);
    assert_eq!(summary.units_with_fallback, 2);
    assert_eq!(summary.backend_calls, 0);

    let calc = out.path().join("calc.py");
    assert_eq!(
        fs::read_to_string(calc.join("modernized/calc.py")).unwrap(),
        CALC_SOURCE
    );
    let ir: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(calc.join("ir.json")).unwrap()).unwrap();
    let ir: ProjectIR = validate(&ir).unwrap();
    assert_eq!(ir.original_filename, "calc.py");

    let order = out.path().join("legacy/Order.java");
    assert!(order.join("docs/TECHNICAL_DEBT.md").is_file());
    assert!(order.join("skeleton/Order.java").is_file());
    let provenance: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(order.join("provenance.json")).unwrap()).unwrap();
    assert_eq!(provenance["stages"][0]["stage"], "analysis");
    assert_eq!(provenance["stages"][0]["provenance"]["source"], "fallback");
    assert_eq!(provenance["stages"][0]["provenance"]["reason"], "no_backend");
    assert!(!out.path().join("README.txt").exists());
}

#[tokio::test]
async fn reruns_are_identical() {
    let input = tempfile::tempdir().unwrap();
    fs::write(input.path().join(CALC_FILENAME), CALC_SOURCE).unwrap();

    let mut outputs = Vec::new();
    for _ in 0..2 {
        let out = tempfile::tempdir().unwrap();
        let options = offline_options(input.path(), out.path());
        let (config, _) = resolve_config(&options, |_| None).unwrap();
        run(&options, config, None).await.unwrap();
        let ir = fs::read_to_string(out.path().join("calc.py/ir.json")).unwrap();
        let readme = fs::read_to_string(out.path().join("calc.py/docs/README.md")).unwrap();
        outputs.push((ir, readme));
    }
    assert_eq!(outputs[0], outputs[1]);
}

#[tokio::test]
async fn empty_directory_is_an_error() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let options = offline_options(input.path(), out.path());
    let (config, _) = resolve_config(&options, |_| None).unwrap();
    assert!(run(&options, config, None).await.is_err());
}
