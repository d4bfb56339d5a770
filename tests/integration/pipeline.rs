//! End-to-end pipeline tests
//!
//! Source text in, instruction stream out, read the way a backend reads it.

use adlc::middle::{drive, render_listing, Backend, BackendError};
use adlc::util::config::{load_config, CompilerConfig, ReportMode};
use adlc::{compile, compile_file, compile_with_config, Instruction, Opcode};
use std::fs;
use tempfile::TempDir;

const ANALYSIS: &str = r#"
# Dijet selection
info analysis
  title "Dijet resonance search"
  experiment CMS

def jetPtCut = 30

obj goodJets : jet
  select pT(jet) > jetPtCut
  reject abs(eta(jet)) > 2.4

obj goodMuons : muon
  select pt > 10

comp dijets : comb( goodJets[0] j1, goodJets[1] j2 )
  select dR(j1, j2) < 1.5

region preselection
  select size(goodJets) >= 2
  histo hjets, "Number of jets", 10, 0, 10, size(goodJets)

region signal
  take preselection
  select m(goodJets[0] goodJets[1]) within [500, 1500]
  weight w1 1.2
"#;

#[test]
fn test_full_analysis_compiles() {
    let stream = compile(ANALYSIS).unwrap();
    assert!(!stream.is_empty());

    let ops: Vec<Opcode> = stream.iter().map(|i| i.opcode).collect();
    for expected in [
        Opcode::CreateMask,
        Opcode::ApplyMask,
        Opcode::MakeEmptyComb,
        Opcode::CreateRegion,
        Opcode::CutRegion,
        Opcode::MergeRegions,
        Opcode::Hist1d,
        Opcode::WeightApply,
    ] {
        assert!(ops.contains(&expected), "missing {}", expected);
    }
}

#[test]
fn test_cursor_consumes_stream() {
    let mut stream = compile("def x = 1 + 2\n").unwrap();
    let total = stream.len();

    let mut pulled = 0;
    while stream.more() {
        assert!(stream.take().is_some());
        pulled += 1;
    }
    assert_eq!(pulled, total);
    assert!(stream.take().is_none());

    stream.rewind();
    assert!(stream.more());
}

/// Counts instructions and refuses histograms
struct NoHistograms(usize);

impl Backend for NoHistograms {
    type Output = usize;

    fn translate(
        &mut self,
        instruction: &Instruction,
    ) -> Result<(), BackendError> {
        match instruction.opcode {
            Opcode::Hist1d | Opcode::Hist2d => Err(BackendError::UnmappedOpcode {
                opcode: instruction.opcode,
            }),
            _ => {
                self.0 += 1;
                Ok(())
            }
        }
    }

    fn finish(self) -> usize {
        self.0
    }
}

#[test]
fn test_backend_drive() {
    let mut stream = compile("def x = met * 2\nregion sr\n  select x > 3\n").unwrap();
    let total = stream.len();
    assert_eq!(drive(&mut stream, NoHistograms(0)).unwrap(), total);

    let mut stream = compile(ANALYSIS).unwrap();
    let err = drive(&mut stream, NoHistograms(0)).unwrap_err();
    assert_eq!(
        err,
        BackendError::UnmappedOpcode {
            opcode: Opcode::Hist1d
        }
    );
}

#[test]
fn test_listing_and_json() {
    let stream = compile("obj goodJets : jet\n  select pt > 30\n").unwrap();

    let listing = render_listing(&stream);
    assert_eq!(
        listing.lines().filter(|line| line.contains(" <- ")).count(),
        stream.len()
    );
    assert!(listing.contains("CREATE_MASK"));

    let json = stream.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let instructions = value["instructions"].as_array().unwrap();
    assert_eq!(instructions.len(), stream.len());
    assert_eq!(instructions[0]["opcode"], "MAKE_EMPTY_PARTICLE");
}

#[test]
fn test_compile_file_with_config() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("analysis.adl");
    fs::write(&source, ANALYSIS).unwrap();
    let config_path = dir.path().join("adlc.toml");
    fs::write(&config_path, "cutflow = \"last\"\neventlist = \"all\"\n").unwrap();

    let config = load_config(&config_path).unwrap();
    assert_eq!(config.cutflow, ReportMode::Last);

    let stream = compile_file(&source, &config).unwrap();
    let count = |op| stream.iter().filter(|i| i.opcode == op).count();
    assert_eq!(count(Opcode::DoCutflowOnRegion), 1);
    assert_eq!(count(Opcode::DoEventlistOnRegion), 2);
}

#[test]
fn test_missing_config_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let config = load_config(dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, CompilerConfig::default());

    let stream = compile_with_config("region a\n  select all\n", &config).unwrap();
    assert!(stream
        .iter()
        .any(|i| i.opcode == Opcode::DoCutflowOnRegion));
}
