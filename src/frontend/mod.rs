//! Frontend compilation pipeline
//!
//! This module contains the lexer and the parser.
//! The frontend transforms ADL source into an instruction stream by
//! handing the syntax tree to the lowering in `middle`.

use crate::middle::{self, InstructionStream, LoweringConfig};
use crate::util::config::CompilerConfig;
use thiserror::Error;
use tracing::debug;

pub mod core;

use self::core::lexer::{self, LexError, Token};
use self::core::parser::{self, Ast, ParseError};

/// Compiler context
#[derive(Debug, Default)]
pub struct Compiler {
    /// Report selection applied during lowering
    config: LoweringConfig,
}

impl Compiler {
    /// Create a new compiler
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compiler honouring `config`
    pub fn with_config(config: &CompilerConfig) -> Self {
        Self {
            config: LoweringConfig::from(config),
        }
    }

    /// Tokenize source code
    pub fn tokenize(
        &self,
        source: &str,
    ) -> Result<Vec<Token>, CompileError> {
        Ok(lexer::tokenize(source)?)
    }

    /// Tokenize and parse source code
    pub fn parse(
        &self,
        source: &str,
    ) -> Result<Ast, CompileError> {
        let tokens = self.tokenize(source)?;
        Ok(parser::parse(&tokens)?)
    }

    /// Compile source code to IR
    pub fn compile(
        &self,
        source: &str,
    ) -> Result<InstructionStream, CompileError> {
        debug!("Compiling source code ({} bytes)", source.len());
        // Lexical analysis
        let tokens = self.tokenize(source)?;
        debug!("Tokenized into {} tokens", tokens.len());

        // Parsing
        debug!("Starting parsing...");
        let ast = parser::parse(&tokens)?;
        debug!(
            "Parsing successful, got {} blocks",
            ast.children(ast.root()).len()
        );

        // Lowering
        debug!("Starting lowering...");
        let stream = middle::lower(&ast, &self.config)?;
        debug!("Lowering successful, {} instructions", stream.len());

        Ok(stream)
    }
}

/// Compilation errors
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Lexical error")]
    LexError(#[from] LexError),

    #[error("Parse error")]
    ParseError(#[from] ParseError),

    #[error("Lowering error")]
    LoweringError(#[from] middle::LoweringError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middle::Opcode;
    use crate::util::config::ReportMode;

    const SOURCE: &str = "\
obj goodJets : jet
  select pT(jet) > 30

region presel
  select ALL

region signal
  select size(goodJets) >= 2
";

    #[test]
    fn test_compile_pipeline() {
        let stream = Compiler::new().compile(SOURCE).unwrap();
        let cutflows = stream
            .iter()
            .filter(|inst| inst.opcode == Opcode::DoCutflowOnRegion)
            .count();
        assert_eq!(cutflows, 2);
        assert!(stream.iter().any(|inst| inst.opcode == Opcode::ApplyMask));
    }

    #[test]
    fn test_config_reaches_lowering() {
        let config = CompilerConfig {
            cutflow: ReportMode::Last,
            eventlist: ReportMode::All,
            ..CompilerConfig::default()
        };
        let stream = Compiler::with_config(&config).compile(SOURCE).unwrap();
        let cutflows: Vec<_> = stream
            .iter()
            .filter(|inst| inst.opcode == Opcode::DoCutflowOnRegion)
            .collect();
        assert_eq!(cutflows.len(), 1);
        assert!(cutflows[0].operand(0).unwrap().ends_with("_REGsignal"));
        assert_eq!(
            stream
                .iter()
                .filter(|inst| inst.opcode == Opcode::DoEventlistOnRegion)
                .count(),
            2
        );
    }

    #[test]
    fn test_error_stages() {
        let compiler = Compiler::new();
        assert!(matches!(
            compiler.compile("region r\n  select \"open"),
            Err(CompileError::LexError(_))
        ));
        assert!(matches!(
            compiler.compile("region\n"),
            Err(CompileError::ParseError(_))
        ));
        assert!(matches!(
            compiler.compile("region r\n  select fMR(jets) > 1\n"),
            Err(CompileError::LoweringError(
                middle::LoweringError::NotImplemented { .. }
            ))
        ));
    }

    #[test]
    fn test_error_message_is_not_repeated() {
        let err = Compiler::new()
            .compile("region r\n  select fMR(jets) > 1\n")
            .unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Lowering error"));
        assert!(!message.contains("fMR"));
        let chained = format!("{:#}", anyhow::Error::from(err));
        assert_eq!(chained.matches("fMR").count(), 1);
    }
}
