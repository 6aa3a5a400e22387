use super::*;
use markup::{Document, PatchRecorder};
use serde_json::json;

fn parts(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}

#[test]
fn resolve_walks_objects_and_arrays() {
    let ctx = json!({"post": {"tags": ["a", "b"], "author": {"name": "Ann"}}});
    assert_eq!(resolve(&ctx, &parts("post.author.name")), Some(&json!("Ann")));
    assert_eq!(resolve(&ctx, &parts("post.tags.1")), Some(&json!("b")));
    assert_eq!(resolve(&ctx, &parts("post.missing.name")), None);
    assert_eq!(resolve(&ctx, &parts("post.tags.9")), None);
    assert_eq!(resolve(&ctx, &parts("post.author.name.len")), None);
    assert_eq!(resolve(&ctx, &[]), Some(&ctx));
}

#[test]
fn resolve_path_accepts_scoped_spellings() {
    let ctx = json!({"a": {"b": 1}});
    assert_eq!(resolve_path(&ctx, "this.a/b"), Some(&json!(1)));
    assert_eq!(resolve_path(&ctx, "this"), Some(&ctx));
    assert_eq!(resolve_path(&ctx, "../a"), None);
}

#[test]
fn stringify_and_attribute_hook() {
    assert_eq!(stringify(&json!(null)), "");
    assert_eq!(stringify(&json!(2.5)), "2.5");
    assert_eq!(stringify(&json!(true)), "true");
    assert_eq!(stringify(&json!([1, 2])), "1,2");
    assert_eq!(stringify(&json!(["a", null, [true, 2.5]])), "a,,true,2.5");
    assert_eq!(
        attribute_value(&[Some(json!("btn ")), None, Some(json!(null)), Some(json!(3))]),
        "btn 3"
    );
    assert!(is_absent(None));
    assert!(is_absent(Some(&Value::Null)));
    assert!(!is_absent(Some(&json!(""))));
}

#[test]
fn ambiguous_prefers_helpers() {
    let mut helpers = HelperRegistry::new();
    helpers.register("title", |_: &[Value], options: &mut HelperOptions<'_>| {
        assert!(options.types.is_empty());
        Ok(Some(json!("from helper")))
    });
    let ctx = json!({"title": "from context", "other": 1});
    let mut doc = Document::new();
    let el = doc.create_element("div");
    assert_eq!(
        ambiguous_resolve(&helpers, "title", &ctx, el, true, &mut doc).expect("ok"),
        Some(json!("from helper"))
    );
    assert_eq!(
        ambiguous_resolve(&helpers, "other", &ctx, el, true, &mut doc).expect("ok"),
        Some(json!(1))
    );
    assert_eq!(
        ambiguous_resolve(&helpers, "nothing", &ctx, el, true, &mut doc).expect("ok"),
        None
    );
}

#[test]
fn invoke_helper_passes_types_and_hash() {
    let mut helpers = HelperRegistry::new();
    helpers.register("describe", |args: &[Value], options: &mut HelperOptions<'_>| {
        let sep = options.resolve_hash("sep").map(|v| stringify(&v)).unwrap_or_default();
        let described: Vec<String> = args
            .iter()
            .zip(options.types)
            .map(|(arg, kind)| format!("{kind}:{}", stringify(arg)))
            .collect();
        Ok(Some(Value::String(described.join(&sep))))
    });
    let call = HelperCall {
        name: "describe".to_string(),
        args: Vec::new(),
        types: vec!["id", "number"],
        hash: Vec::new(),
        escaped: true,
    };
    let mut doc = Document::new();
    let root = doc.create_fragment();
    let out = invoke_helper(
        &helpers,
        &call,
        vec![json!("user.name"), json!(3)],
        vec![("sep".to_string(), json!("|"), "string")],
        &json!({}),
        root,
        &mut doc,
    )
    .expect("helper runs");
    assert_eq!(out, Some(json!("id:user.name|number:3")));
}

#[test]
fn unknown_helper_is_an_error() {
    let call = HelperCall {
        name: "nope".to_string(),
        args: Vec::new(),
        types: Vec::new(),
        hash: Vec::new(),
        escaped: true,
    };
    let mut doc = Document::new();
    let root = doc.create_fragment();
    let err = invoke_helper(&HelperRegistry::new(), &call, Vec::new(), Vec::new(), &json!({}), root, &mut doc)
        .expect_err("unknown");
    assert_eq!(err, RuntimeError::UnknownHelper { name: "nope".to_string() });
}

#[test]
fn builtin_lookup_resolves_id_arguments() {
    let helpers = HelperRegistry::with_builtins();
    let call = HelperCall {
        name: "lookup".to_string(),
        args: Vec::new(),
        types: vec!["id", "id"],
        hash: Vec::new(),
        escaped: true,
    };
    let ctx = json!({"names": {"en": "Hello"}, "lang": "en"});
    let mut doc = Document::new();
    let root = doc.create_fragment();
    let out = invoke_helper(
        &helpers,
        &call,
        vec![json!("names"), json!("lang")],
        Vec::new(),
        &ctx,
        root,
        &mut doc,
    )
    .expect("lookup");
    assert_eq!(out, Some(json!("Hello")));
    assert!(helpers.contains("log"));
}

#[test]
fn insertion_policy() {
    let mut doc = Document::new();
    let root = doc.create_fragment();
    let text = insert_value(&mut doc, root, None, Some(&json!("<b>x</b>")), InsertMode::Text);
    assert_eq!(text.len(), 1);
    let raw = insert_value(&mut doc, root, None, Some(&json!("<b>x</b>")), InsertMode::Fragment);
    assert_eq!(raw.len(), 1);
    assert!(insert_value(&mut doc, root, None, Some(&Value::Null), InsertMode::Text).is_empty());
    assert!(insert_value(&mut doc, root, None, None, InsertMode::Fragment).is_empty());
    assert_eq!(doc.to_html(root), "&lt;b&gt;x&lt;/b&gt;<b>x</b>");
}

#[test]
fn helpers_may_build_nodes_themselves() {
    let mut helpers = HelperRegistry::new();
    helpers.register("badge", |_: &[Value], options: &mut HelperOptions<'_>| {
        let span = options.backend.create_element("span");
        let text = options.backend.create_text("new");
        options.backend.append_child(span, text);
        options.backend.append_child(options.element, span);
        Ok(None)
    });
    let mut recorder = PatchRecorder::new();
    let root = recorder.create_fragment();
    let out = ambiguous_resolve(&helpers, "badge", &json!({}), root, true, &mut recorder).expect("ok");
    assert_eq!(out, None);
    assert_eq!(recorder.patches().len(), 5);
}
