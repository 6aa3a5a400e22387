#![no_main]

use libfuzzer_sys::fuzz_target;
use markup::PatchRecorder;
use serde_json::json;
use template::{CompileOptions, Environment};

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    let env = Environment::new().with_helper("echo", |args, _| Ok(args.first().cloned()));
    let options = CompileOptions::default().bind_markers(true);
    // Compile errors are expected for arbitrary input; panics are not.
    let Ok(template) = env.compile(source, &options) else {
        return;
    };
    let context = json!({"title": "<b>x</b>", "items": [1, 2], "user": {"name": "n"}});
    if let Ok(mut rendered) = template.render(&context) {
        for id in 0..rendered.bindings().len() {
            let _ = template.rerender(&mut rendered, id, &json!({}));
        }
        let _ = rendered.to_html();
    }
    let mut recorder = PatchRecorder::new();
    let _ = template.render_into(&context, &mut recorder);
});
