//! End-to-end tests: Python sources in, draw.io and Mermaid documents out.

use std::fs;
use std::path::Path;

use flowmap::cli::{run_render, RenderArgs, EXIT_NO_INPUTS, EXIT_SUCCESS};
use flowmap::config::Config;
use flowmap::render::{render_all, write_outputs, OutputFormat, RenderModel};
use flowmap::runner::Runner;
use flowmap::report::SummaryFormat;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, source: &str) {
    fs::write(dir.join(name), source).unwrap();
}

fn two_units(dir: &Path) {
    write(
        dir,
        "a.py",
        "from b import bar\n\n\ndef foo():\n    bar()\n    helper()\n\n\ndef helper():\n    pass\n",
    );
    write(dir, "b.py", "def bar():\n    pass\n");
}

fn render_both(config: &Config, dir: &Path) -> (String, String) {
    let files = vec![dir.join("a.py"), dir.join("b.py")];
    let result = Runner::new(config).run(&files).unwrap();
    let render_config = config.render_config();
    let model = RenderModel::new(&result.graph, &result.layout, &render_config);
    let documents = render_all(
        &model,
        &[
            (OutputFormat::Drawio, dir.join("flow.drawio")),
            (OutputFormat::Mermaid, dir.join("flow.md")),
        ],
    );
    (documents[0].contents.clone(), documents[1].contents.clone())
}

#[test]
fn test_inter_module_only_leaves_one_dashed_edge() {
    let temp = TempDir::new().unwrap();
    two_units(temp.path());

    let mut config = Config::default();
    config.filters.inter_module_only = true;
    let (drawio, mermaid) = render_both(&config, temp.path());

    assert_eq!(drawio.matches("edge=\"1\"").count(), 1);
    assert_eq!(drawio.matches("dashed=1;").count(), 1);
    assert!(drawio.contains("value=\"foo()\""));
    assert!(drawio.contains("value=\"bar()\""));

    assert_eq!(mermaid.matches(" -.-> ").count(), 1);
    assert_eq!(mermaid.matches(" --> ").count(), 0);
    assert!(mermaid.contains("  a_foo -.-> b_bar\n"));
}

#[test]
fn test_intra_module_edges_are_solid() {
    let temp = TempDir::new().unwrap();
    two_units(temp.path());

    let (drawio, mermaid) = render_both(&Config::default(), temp.path());
    assert_eq!(drawio.matches("edge=\"1\"").count(), 2);
    assert_eq!(drawio.matches("dashed=1;").count(), 1);
    assert!(mermaid.contains("  a_foo --> a_helper\n"));
    assert!(mermaid.contains("  a_foo -.-> b_bar\n"));
}

#[test]
fn test_hide_private_removes_nodes_and_edges() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "a.py",
        "def foo():\n    _secret()\n\n\ndef _secret():\n    pass\n",
    );
    write(temp.path(), "b.py", "def bar():\n    pass\n");

    let mut config = Config::default();
    config.filters.hide_private = true;
    let (drawio, mermaid) = render_both(&config, temp.path());

    assert!(!drawio.contains("_secret"));
    assert!(!mermaid.contains("_secret"));
    assert_eq!(drawio.matches("edge=\"1\"").count(), 0);
}

#[test]
fn test_renders_are_byte_identical() {
    let temp = TempDir::new().unwrap();
    two_units(temp.path());

    let mut config = Config::default();
    config.database.include = true;
    config.render.label_edges = true;
    assert_eq!(
        render_both(&config, temp.path()),
        render_both(&config, temp.path())
    );
}

#[test]
fn test_outputs_written_atomically() {
    let temp = TempDir::new().unwrap();
    two_units(temp.path());

    let config = Config::default();
    let files = vec![temp.path().join("a.py"), temp.path().join("b.py")];
    let result = Runner::new(&config).run(&files).unwrap();
    let render_config = config.render_config();
    let model = RenderModel::new(&result.graph, &result.layout, &render_config);

    let out = temp.path().join("out/nested");
    let targets = vec![
        (OutputFormat::Drawio, out.join("flow.drawio")),
        (OutputFormat::Mermaid, out.join("flow.md")),
    ];
    let written = write_outputs(&render_all(&model, &targets)).unwrap();
    assert_eq!(written.len(), 2);

    let mut names: Vec<_> = fs::read_dir(&out)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["flow.drawio", "flow.md"]);
    assert!(fs::read_to_string(out.join("flow.drawio"))
        .unwrap()
        .contains("<mxfile"));
    assert!(fs::read_to_string(out.join("flow.md"))
        .unwrap()
        .contains("```mermaid"));
}

#[test]
fn test_render_command_end_to_end() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    fs::create_dir_all(&src).unwrap();
    two_units(&src);
    let out = temp.path().join("diagrams");

    let args = RenderArgs {
        paths: vec![src],
        out_dir: Some(out.clone()),
        formats: vec![OutputFormat::Mermaid],
        mermaid_file: Some("calls.md".into()),
        summary: SummaryFormat::Json,
        ..Default::default()
    };
    assert_eq!(run_render(&args).unwrap(), EXIT_SUCCESS);

    let text = fs::read_to_string(out.join("calls.md")).unwrap();
    assert!(text.contains("flowchart TD"));
    assert!(!out.join("flow.drawio").exists());
}

#[test]
fn test_render_command_without_inputs() {
    let temp = TempDir::new().unwrap();
    let args = RenderArgs {
        paths: vec![temp.path().to_path_buf()],
        out_dir: Some(temp.path().join("docs")),
        ..Default::default()
    };
    assert_eq!(run_render(&args).unwrap(), EXIT_NO_INPUTS);
    assert!(!temp.path().join("docs").exists());
}
