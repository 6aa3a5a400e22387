use serde_json::Value;
use std::path::Path;
use template::runtime::stringify;
use template::{CompileError, CompileOptions, Environment, RuntimeError};
use template_test_support::escape_text;
use template_test_support::fixtures::{FixtureStatus, RenderFixture, load_fixtures};

fn environment() -> Environment {
    Environment::new()
        .with_helper("testing", |args, options| {
            let kind = options.types.first().copied().unwrap_or("none");
            let arg = args.first().map(stringify).unwrap_or_default();
            Ok(Some(Value::String(format!("{kind}-{arg}"))))
        })
        .with_helper("shout", |args, options| {
            Ok(options
                .resolve_arg(args, 0)
                .map(|value| Value::String(stringify(&value).to_uppercase())))
        })
}

fn compile_error_kind(err: &CompileError) -> &'static str {
    match err {
        CompileError::Parse(_) => "parse",
        CompileError::Markup(_) => "markup",
        CompileError::StructuralMismatch { .. } => "structural_mismatch",
        CompileError::UnclosedElement { .. } => "unclosed_element",
        CompileError::MisplacedBlock { .. } => "misplaced_block",
        CompileError::MacroNonTermination { .. } => "macro_non_termination",
        CompileError::InternalStackImbalance(_) => "internal",
    }
}

fn runtime_error_kind(err: &RuntimeError) -> &'static str {
    match err {
        RuntimeError::UnknownHelper { .. } => "unknown_helper",
        RuntimeError::Helper { .. } => "helper",
        RuntimeError::UnknownBinding { .. } => "unknown_binding",
    }
}

fn run(env: &Environment, fixture: &RenderFixture) -> Result<String, String> {
    let options: CompileOptions = if fixture.options.is_null() {
        CompileOptions::default()
    } else {
        serde_json::from_value(fixture.options.clone())
            .unwrap_or_else(|err| panic!("fixture '{}' has invalid options: {err}", fixture.name))
    };
    let template = env
        .compile(&fixture.template, &options)
        .map_err(|err| compile_error_kind(&err).to_string())?;
    let rendered = template
        .render(&fixture.context)
        .map_err(|err| runtime_error_kind(&err).to_string())?;
    Ok(rendered.to_html())
}

#[test]
fn golden_render_fixtures() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/render.toml");
    let fixtures = load_fixtures(&path);
    assert!(!fixtures.is_empty(), "no fixtures in {path:?}");
    let env = environment();

    let mut failures = Vec::new();
    let mut ran = 0usize;
    for fixture in &fixtures {
        if fixture.status == FixtureStatus::Skip {
            continue;
        }
        ran += 1;
        let actual = run(&env, fixture);
        let expected = match (&fixture.expected, &fixture.error) {
            (Some(html), None) => Ok(html.clone()),
            (None, Some(kind)) => Err(kind.clone()),
            _ => unreachable!("validated by parse_fixtures"),
        };
        if actual != expected {
            failures.push(format!(
                "{}\n  template: \"{}\"\n  expected: {:?}\n    actual: {:?}",
                fixture.name,
                escape_text(&fixture.template),
                expected,
                actual
            ));
        }
    }
    assert!(ran > 0);
    assert!(
        failures.is_empty(),
        "{} of {ran} fixture(s) failed:\n{}",
        failures.len(),
        failures.join("\n")
    );
}
