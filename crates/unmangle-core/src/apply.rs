//! AST rename pass.
//!
//! Parses the source with SWC, rewrites every identifier node whose name is
//! a key of the rename map, and serializes the result. Renaming is
//! name-based, not scope-based: every occurrence of a matching identifier
//! name anywhere in the file is renamed identically. That is a documented
//! limitation carried over deliberately, not a scoping engine waiting to be
//! written.
//!
//! Member-expression property names and object literal keys are `IdentName`
//! nodes in this AST, not `Ident`, so `obj.c` keeps its `.c` even when the
//! variable `c` is renamed. String and regex literal contents are never
//! touched. No hygiene or fixer passes run here: they would re-mangle the
//! names we just applied.

use crate::error::Error;
use crate::merge::RenameMap;
use swc_common::comments::SingleThreadedComments;
use swc_common::errors::Handler;
use swc_common::sync::Lrc;
use swc_common::{FileName, SourceMap};
use swc_ecma_ast::{EsVersion, Ident, Program};
use swc_ecma_codegen::text_writer::JsWriter;
use swc_ecma_codegen::Emitter;
use swc_ecma_parser::lexer::Lexer;
use swc_ecma_parser::{EsSyntax, Parser, StringInput, Syntax};
use swc_ecma_visit::{VisitMut, VisitMutWith};

/// Identifier rewriter over the whole tree.
struct IdentRenamer<'a> {
    map: &'a RenameMap,
    renamed: usize,
}

impl VisitMut for IdentRenamer<'_> {
    fn visit_mut_ident(&mut self, ident: &mut Ident) {
        if let Some(new_name) = self.map.get(&ident.sym) {
            ident.sym = new_name.into();
            self.renamed += 1;
        }
    }
}

/// Apply `map` to `source` in one rewrite pass.
///
/// Output is the serializer's rendering of the rewritten tree; byte-level
/// whitespace is owned by the downstream formatter. Applying an empty map,
/// or a map none of whose keys occur, re-renders the source unchanged
/// (idempotent on its own output).
///
/// # Errors
/// `Error::Parse` if the source is not valid JavaScript — fatal, with no
/// partial output.
pub fn apply_renames(source: &str, map: &RenameMap) -> Result<String, Error> {
    let cm: Lrc<SourceMap> = Lrc::default();
    // Diagnostics go through the Result; the handler just absorbs emission.
    let handler = Handler::with_emitter_writer(Box::new(std::io::sink()), Some(cm.clone()));

    let fm = cm.new_source_file(
        Lrc::new(FileName::Custom("input.js".to_string())),
        source.to_string(),
    );

    let comments = SingleThreadedComments::default();
    let syntax = Syntax::Es(EsSyntax {
        jsx: false,
        decorators: true,
        ..Default::default()
    });

    let lexer = Lexer::new(
        syntax,
        EsVersion::EsNext,
        StringInput::from(&*fm),
        Some(&comments),
    );
    let mut parser = Parser::new_from(lexer);

    let mut program = parser.parse_program().map_err(|e| {
        let kind = format!("{:?}", e.kind());
        e.into_diagnostic(&handler).emit();
        Error::parse(format!("failed to parse source: {kind}"))
    })?;

    let errors: Vec<String> = parser
        .take_errors()
        .into_iter()
        .map(|e| format!("{:?}", e.kind()))
        .collect();
    if !errors.is_empty() {
        return Err(Error::parse(errors.join(", ")));
    }

    let mut renamer = IdentRenamer { map, renamed: 0 };
    program.visit_mut_with(&mut renamer);
    tracing::debug!(renamed = renamer.renamed, keys = map.len(), "applied rename pass");

    let mut buf = Vec::new();
    {
        let writer = JsWriter::new(cm.clone(), "\n", &mut buf, None);
        let mut emitter = Emitter {
            cfg: swc_ecma_codegen::Config::default(),
            cm: cm.clone(),
            comments: Some(&comments),
            wr: writer,
        };
        match &program {
            Program::Module(module) => emitter.emit_module(module),
            Program::Script(script) => emitter.emit_script(script),
        }
        .map_err(|e| Error::Emit(format!("failed to emit source: {e}")))?;
    }

    String::from_utf8(buf).map_err(|e| Error::Emit(format!("invalid UTF-8 output: {e}")))
}
