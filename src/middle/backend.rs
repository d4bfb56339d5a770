//! Backend interface
//!
//! Code generators consume a lowered [`InstructionStream`] one instruction
//! at a time through the cursor. A backend that meets an opcode it has no
//! translation for must say so; [`drive`] stops at the first failure.
//!
//! ```text
//! InstructionStream --take()--> Backend::translate --finish()--> Output
//! ```

use crate::middle::ir::{Instruction, InstructionStream, Opcode};

/// Backend failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("No translation exists for instruction {opcode}")]
    UnmappedOpcode { opcode: Opcode },
    #[error("Invalid operands for {opcode}: {message}")]
    InvalidOperands { opcode: Opcode, message: String },
}

/// Target code generator
pub trait Backend {
    /// What the backend produces once the stream is exhausted
    type Output;

    /// Translate one instruction
    fn translate(
        &mut self,
        instruction: &Instruction,
    ) -> Result<(), BackendError>;

    /// Consume the backend and return its product
    fn finish(self) -> Self::Output;
}

/// Feed every remaining instruction of `stream` to `backend`
pub fn drive<B: Backend>(
    stream: &mut InstructionStream,
    mut backend: B,
) -> Result<B::Output, BackendError> {
    while let Some(instruction) = stream.take() {
        if let Err(err) = backend.translate(instruction) {
            tracing::debug!("Backend stopped at {}: {}", instruction, err);
            return Err(err);
        }
    }
    Ok(backend.finish())
}

/// Human-readable listing, one instruction per line:
///
/// ```text
/// (_MASKJets)       <- CREATE_MASK   (_V1_MASKJets)
/// ```
///
/// Destinations and opcodes are padded to the widest in the stream, an
/// instruction without a destination leaves its slot blank, and blank
/// lines separate the particle, mask and region groups.
#[derive(Debug, Default)]
pub struct ListingBackend {
    rows: Vec<Row>,
}

#[derive(Debug)]
struct Row {
    opcode: Opcode,
    dest: String,
    args: String,
}

impl ListingBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for ListingBackend {
    type Output = String;

    fn translate(
        &mut self,
        instruction: &Instruction,
    ) -> Result<(), BackendError> {
        let args: String = instruction
            .args
            .iter()
            .map(|arg| format!(" ({})", arg))
            .collect();
        self.rows.push(Row {
            opcode: instruction.opcode,
            dest: instruction.dest.clone().unwrap_or_default(),
            args,
        });
        Ok(())
    }

    fn finish(self) -> String {
        let dest_width = self.rows.iter().map(|row| row.dest.len()).max().unwrap_or(0) + 4;
        let opcode_width = self
            .rows
            .iter()
            .map(|row| row.opcode.name().len())
            .max()
            .unwrap_or(0)
            + 1;

        let mut out = String::new();
        for row in &self.rows {
            if row.opcode.starts_group() && !out.is_empty() && !out.ends_with("\n\n") {
                out.push('\n');
            }
            let slot = if row.dest.is_empty() {
                String::new()
            } else {
                format!("({}) ", row.dest)
            };
            let line = format!(
                "{:<dest_width$} <- {:<opcode_width$}{}",
                slot,
                row.opcode.name(),
                row.args,
            );
            out.push_str(line.trim_end());
            out.push('\n');
            if row.opcode.ends_group() {
                out.push('\n');
            }
        }
        out
    }
}

/// Render the whole stream as a listing without moving its cursor
pub fn render_listing(stream: &InstructionStream) -> String {
    let mut backend = ListingBackend::new();
    for instruction in stream {
        // the listing maps every opcode
        let _ = backend.translate(instruction);
    }
    backend.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Backend that only understands aliases
    struct AliasOnly(Vec<String>);

    impl Backend for AliasOnly {
        type Output = Vec<String>;

        fn translate(
            &mut self,
            instruction: &Instruction,
        ) -> Result<(), BackendError> {
            match instruction.opcode {
                Opcode::AddAlias => {
                    self.0.push(instruction.operand(0).unwrap_or_default());
                    Ok(())
                }
                opcode => Err(BackendError::UnmappedOpcode { opcode }),
            }
        }

        fn finish(self) -> Vec<String> {
            self.0
        }
    }

    fn sample() -> InstructionStream {
        InstructionStream::new(vec![
            Instruction::new(Opcode::MakeEmptyParticle).dest("_V0_MASKJets"),
            Instruction::new(Opcode::AddPartJet)
                .dest("_V1_MASKJets")
                .name("_V0_MASKJets"),
            Instruction::new(Opcode::CreateMask)
                .dest("_MASKJets")
                .name("_V1_MASKJets"),
            Instruction::new(Opcode::EndExpression)
                .dest("_V4_MASKJets_COND")
                .name("_V3_MASKJets"),
            Instruction::new(Opcode::ApplyMask)
                .dest("Jets")
                .name("_L5_MASKJets")
                .name("jet"),
        ])
    }

    #[test]
    fn test_drive_collects_output() {
        let mut stream = InstructionStream::new(vec![
            Instruction::new(Opcode::AddAlias).dest("a").literal("1"),
            Instruction::new(Opcode::AddAlias).dest("b").literal("2"),
        ]);
        let names = drive(&mut stream, AliasOnly(Vec::new())).unwrap();
        assert_eq!(names, vec!["a", "b"]);
        assert!(!stream.more());
    }

    #[test]
    fn test_drive_fails_on_unmapped_opcode() {
        let mut stream = sample();
        let err = drive(&mut stream, AliasOnly(Vec::new())).unwrap_err();
        assert_eq!(
            err,
            BackendError::UnmappedOpcode {
                opcode: Opcode::MakeEmptyParticle
            }
        );
        assert_eq!(
            err.to_string(),
            "No translation exists for instruction MAKE_EMPTY_PARTICLE"
        );
    }

    #[test]
    fn test_listing_alignment() {
        let listing = render_listing(&sample());
        let lines: Vec<&str> = listing.lines().collect();

        // widest dest is `_V4_MASKJets_COND` (17), widest opcode MAKE_EMPTY_PARTICLE (19)
        assert_eq!(
            lines[0],
            format!("{:<21} <- {:<20}", "(_V0_MASKJets) ", "MAKE_EMPTY_PARTICLE").trim_end()
        );
        assert_eq!(
            lines[1],
            format!(
                "{:<21} <- {:<20}{}",
                "(_V1_MASKJets) ", "ADD_PART_JET", " (_V0_MASKJets)"
            )
        );
        // CREATE_MASK opens a group
        assert_eq!(lines[2], "");
        assert!(lines[3].contains("<- CREATE_MASK"));
        // END_EXPRESSION closes one
        assert!(lines[4].contains("END_EXPRESSION"));
        assert!(lines[4].starts_with("(_V4_MASKJets_COND) "));
        assert_eq!(lines[5], "");
        assert!(lines[6].starts_with("(Jets) "));
    }

    #[test]
    fn test_listing_without_dest() {
        let stream = InstructionStream::new(vec![Instruction::new(Opcode::DoCutflowOnRegion)
            .name("_REGsr")]);
        let listing = render_listing(&stream);
        assert_eq!(
            listing,
            format!("{:<4} <- {:<21}{}\n", "", "DO_CUTFLOW_ON_REGION", " (_REGsr)")
        );
        assert!(!listing.contains("()"));
    }

    #[test]
    fn test_listing_blank_slot_keeps_alignment() {
        let stream = InstructionStream::new(vec![
            Instruction::new(Opcode::CreateRegion).dest("_REGsr"),
            Instruction::new(Opcode::DoCutflowOnRegion).name("_REGsr"),
        ]);
        let listing = render_listing(&stream);
        let lines: Vec<&str> = listing.lines().filter(|line| !line.is_empty()).collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with(&" ".repeat(10)));
        assert_eq!(lines[0].find("<-"), lines[1].find("<-"));
    }
}
