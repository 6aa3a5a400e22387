//! Compiler context and compiled templates.

use crate::ast;
use crate::builder;
use crate::codegen::{self, Program};
use crate::error::{CompileError, RuntimeError};
use crate::macros::{MacroAction, MacroRegistry};
use crate::opcodes;
use crate::options::CompileOptions;
use crate::parser::{ExpressionParser, MustacheParser};
use crate::runtime::{BoundRange, HelperOptions, HelperRegistry, Machine, RenderOutput};
use crate::tree::Element;
use markup::{Document, NodeKey, TreeBackend};
use serde_json::Value;
use std::sync::Arc;

/// Helpers and macros known to a compilation.
///
/// There is no global registry: each `Environment` is independent, and a
/// compiled `Template` keeps the helpers it was compiled with.
#[derive(Clone, Debug)]
pub struct Environment {
    helpers: HelperRegistry,
    macros: MacroRegistry,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// Environment with the built-in `lookup` and `log` helpers and no macros.
    pub fn new() -> Self {
        Self {
            helpers: HelperRegistry::with_builtins(),
            macros: MacroRegistry::new(),
        }
    }

    pub fn helpers(&self) -> &HelperRegistry {
        &self.helpers
    }

    pub fn macros(&self) -> &MacroRegistry {
        &self.macros
    }

    pub fn register_helper<F>(&mut self, name: impl Into<String>, helper: F)
    where
        F: Fn(&[Value], &mut HelperOptions<'_>) -> Result<Option<Value>, RuntimeError> + Send + Sync + 'static,
    {
        self.helpers.register(name, helper);
    }

    pub fn unregister_helper(&mut self, name: &str) -> bool {
        self.helpers.unregister(name)
    }

    pub fn with_helper<F>(mut self, name: impl Into<String>, helper: F) -> Self
    where
        F: Fn(&[Value], &mut HelperOptions<'_>) -> Result<Option<Value>, RuntimeError> + Send + Sync + 'static,
    {
        self.register_helper(name, helper);
        self
    }

    pub fn register_macro<T, M>(&mut self, name: impl Into<String>, test: T, mutate: M)
    where
        T: Fn(&Element) -> bool + Send + Sync + 'static,
        M: Fn(&mut Element) -> MacroAction + Send + Sync + 'static,
    {
        self.macros.register(name, test, mutate);
    }

    pub fn unregister_macro(&mut self, name: &str) -> bool {
        self.macros.unregister(name)
    }

    pub fn with_macro<T, M>(mut self, name: impl Into<String>, test: T, mutate: M) -> Self
    where
        T: Fn(&Element) -> bool + Send + Sync + 'static,
        M: Fn(&mut Element) -> MacroAction + Send + Sync + 'static,
    {
        self.register_macro(name, test, mutate);
        self
    }

    pub fn compile(&self, source: &str, options: &CompileOptions) -> Result<Template, CompileError> {
        self.compile_with(&MustacheParser, source, options)
    }

    /// Compile with a different expression front end.
    pub fn compile_with<P: ExpressionParser + ?Sized>(
        &self,
        parser: &P,
        source: &str,
        options: &CompileOptions,
    ) -> Result<Template, CompileError> {
        let program = parser.parse(source)?;
        self.compile_program(&program, options)
    }

    pub fn compile_program(
        &self,
        program: &ast::Program,
        options: &CompileOptions,
    ) -> Result<Template, CompileError> {
        let nodes = builder::build(program, &self.macros)?;
        let ops = opcodes::compile(&nodes, options);
        let program = codegen::generate(&ops, options)?;
        Ok(Template {
            program: Arc::new(program),
            helpers: self.helpers.clone(),
        })
    }
}

/// Compiled construction program plus the helpers it runs with.
#[derive(Clone, Debug)]
pub struct Template {
    program: Arc<Program>,
    helpers: HelperRegistry,
}

impl Template {
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Render into a fresh `Document`.
    pub fn render(&self, context: &Value) -> Result<Rendered, RuntimeError> {
        let mut document = Document::new();
        let output = self.render_into(context, &mut document)?;
        Ok(Rendered { document, output })
    }

    pub fn render_into(
        &self,
        context: &Value,
        backend: &mut dyn TreeBackend,
    ) -> Result<RenderOutput, RuntimeError> {
        Machine::new(&self.program, &self.helpers, context, backend).render()
    }

    /// Re-evaluate binding `binding` of `rendered` against `context`.
    pub fn rerender(
        &self,
        rendered: &mut Rendered,
        binding: usize,
        context: &Value,
    ) -> Result<(), RuntimeError> {
        self.rerender_into(&mut rendered.document, &mut rendered.output, binding, context)
    }

    pub fn rerender_into(
        &self,
        backend: &mut dyn TreeBackend,
        output: &mut RenderOutput,
        binding: usize,
        context: &Value,
    ) -> Result<(), RuntimeError> {
        Machine::new(&self.program, &self.helpers, context, backend).rerender(output, binding)
    }
}

/// A template rendered into a `Document`.
#[derive(Debug)]
pub struct Rendered {
    pub document: Document,
    pub output: RenderOutput,
}

impl Rendered {
    pub fn root(&self) -> NodeKey {
        self.output.root
    }

    pub fn bindings(&self) -> &[BoundRange] {
        &self.output.bindings
    }

    pub fn to_html(&self) -> String {
        self.document.to_html(self.output.root)
    }
}
