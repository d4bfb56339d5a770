//! Intermediate Representation
//!
//! A lowered analysis is a flat list of [`Instruction`]s over symbolic
//! names. There are no branches or jumps: the list is read front to back
//! through the cursor on [`InstructionStream`].

use std::fmt;

use serde::{Serialize, Serializer};

use crate::util::span::Span;

macro_rules! opcodes {
    ($($(#[$meta:meta])* $variant:ident => $name:literal,)*) => {
        /// Instruction opcode
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Opcode {
            $($(#[$meta])* $variant,)*
        }

        impl Opcode {
            /// Every opcode, in declaration order
            pub const ALL: &'static [Opcode] = &[$(Opcode::$variant,)*];

            pub fn name(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $name,)*
                }
            }
        }
    };
}

opcodes! {
    // Regions and masks
    CreateRegion => "CREATE_REGION",
    MergeRegions => "MERGE_REGIONS",
    CutRegion => "CUT_REGION",
    AddAlias => "ADD_ALIAS",
    AddExternal => "ADD_EXTERNAL",
    AddCorrectionLib => "ADD_CORRECTIONLIB",
    CreateMask => "CREATE_MASK",
    LimitMask => "LIMIT_MASK",
    ApplyMask => "APPLY_MASK",

    // Histograms, bins and tables
    CreateHistList => "CREATE_HIST_LIST",
    AddHistToList => "ADD_HIST_TO_LIST",
    UseHist => "USE_HIST",
    UseHistList => "USE_HIST_LIST",
    Hist1d => "HIST_1D",
    Hist2d => "HIST_2D",
    CreateBin => "CREATE_BIN",
    DoCutflowOnRegion => "DO_CUTFLOW_ON_REGION",
    DoEventlistOnRegion => "DO_EVENTLIST_ON_REGION",
    CreateTable => "CREATE_TABLE",
    CreateTableValue => "CREATE_TABLE_VALUE",
    CreateTableLowerBounds => "CREATE_TABLE_LOWER_BOUNDS",
    CreateTableUpperBounds => "CREATE_TABLE_UPPER_BOUNDS",
    AppendToTable => "APPEND_TO_TABLE",
    FinishTable => "FINISH_TABLE",

    SortAscend => "SORT_ASCEND",
    SortDescend => "SORT_DESCEND",
    WeightApply => "WEIGHT_APPLY",
    EndExpression => "END_EXPRESSION",

    // Expression operators
    ExprRaise => "EXPR_RAISE",
    ExprMultiply => "EXPR_MULTIPLY",
    ExprDivide => "EXPR_DIVIDE",
    ExprAdd => "EXPR_ADD",
    ExprSubtract => "EXPR_SUBTRACT",
    ExprLt => "EXPR_LT",
    ExprLe => "EXPR_LE",
    ExprGt => "EXPR_GT",
    ExprGe => "EXPR_GE",
    ExprEq => "EXPR_EQ",
    ExprNe => "EXPR_NE",
    ExprAnd => "EXPR_AND",
    ExprOr => "EXPR_OR",
    ExprMaximize => "EXPR_MAXIMIZE",
    ExprMinimize => "EXPR_MINIMIZE",
    ExprWithin => "EXPR_WITHIN",
    ExprOutside => "EXPR_OUTSIDE",
    ExprNegate => "EXPR_NEGATE",
    ExprLogicalNot => "EXPR_LOGICAL_NOT",

    // Numeric functions
    FuncAnyOf => "FUNC_ANYOF",
    FuncAllOf => "FUNC_ALLOF",
    FuncSqrt => "FUNC_SQRT",
    FuncAbs => "FUNC_ABS",
    FuncCos => "FUNC_COS",
    FuncSin => "FUNC_SIN",
    FuncTan => "FUNC_TAN",
    FuncSinh => "FUNC_SINH",
    FuncCosh => "FUNC_COSH",
    FuncTanh => "FUNC_TANH",
    FuncExp => "FUNC_EXP",
    FuncLog => "FUNC_LOG",
    FuncAve => "FUNC_AVE",
    FuncSum => "FUNC_SUM",
    FuncHstep => "FUNC_HSTEP",
    FuncDelta => "FUNC_DELTA",
    FuncMin => "FUNC_MIN",
    FuncMax => "FUNC_MAX",
    FuncMinList => "FUNC_MIN_LIST",
    FuncMaxList => "FUNC_MAX_LIST",
    FuncSortAscend => "FUNC_SORT_ASCEND",
    FuncSortDescend => "FUNC_SORT_DESCEND",
    FuncAnyOccurrences => "FUNC_ANYOCCURRENCES",
    FuncNamed => "FUNC_NAMED",

    // Particle accessors
    FuncEnergy => "FUNC_E",
    FuncPt => "FUNC_PT",
    FuncPz => "FUNC_PZ",
    FuncMass => "FUNC_M",
    FuncMSoftDrop => "FUNC_MSOFTDROP",
    FuncCharge => "FUNC_CHARGE",
    FuncFlavor => "FUNC_FLAVOR",
    FuncConstituents => "FUNC_CONSTITUENTS",
    FuncPdgId => "FUNC_PDG_ID",
    FuncJetId => "FUNC_JET_ID",
    FuncIdx => "FUNC_IDX",
    FuncTauTag => "FUNC_TAUTAG",
    FuncCTag => "FUNC_CTAG",
    FuncBTag => "FUNC_BTAG",
    FuncDxy => "FUNC_DXY",
    FuncDz => "FUNC_DZ",
    FuncGenPartIdx => "FUNC_GEN_PART_IDX",
    FuncPhi => "FUNC_PHI",
    FuncRapidity => "FUNC_RAPIDITY",
    FuncEta => "FUNC_ETA",
    FuncTheta => "FUNC_THETA",
    FuncAbsIso => "FUNC_ABS_ISO",
    FuncMiniIso => "FUNC_MINI_ISO",
    FuncIsTight => "FUNC_IS_TIGHT",
    FuncIsMedium => "FUNC_IS_MEDIUM",
    FuncIsLoose => "FUNC_IS_LOOSE",
    FuncDr => "FUNC_DR",
    FuncDphi => "FUNC_DPHI",
    FuncDeta => "FUNC_DETA",
    FuncSize => "FUNC_SIZE",
    FuncFmt2 => "FUNC_FMT2",
    FuncTauTau => "FUNC_TAUTAU",
    FuncHt => "FUNC_HT",
    FuncSphericity => "FUNC_SPHERICITY",
    FuncAplanarity => "FUNC_APLANARITY",
    FuncFirst => "FUNC_FIRST",
    FuncSecond => "FUNC_SECOND",

    // Particle collections
    MakeEmptyParticle => "MAKE_EMPTY_PARTICLE",
    AddPartElectron => "ADD_PART_ELECTRON",
    AddPartMuon => "ADD_PART_MUON",
    AddPartTau => "ADD_PART_TAU",
    AddPartTrack => "ADD_PART_TRACK",
    AddPartLepton => "ADD_PART_LEPTON",
    AddPartPhoton => "ADD_PART_PHOTON",
    AddPartBJet => "ADD_PART_BJET",
    AddPartQgJet => "ADD_PART_QGJET",
    AddPartNumet => "ADD_PART_NUMET",
    AddPartMetlv => "ADD_PART_METLV",
    AddPartGen => "ADD_PART_GEN",
    AddPartJet => "ADD_PART_JET",
    AddPartFJet => "ADD_PART_FJET",
    AddPartNamed => "ADD_PART_NAMED",
    SubPartElectron => "SUB_PART_ELECTRON",
    SubPartMuon => "SUB_PART_MUON",
    SubPartTau => "SUB_PART_TAU",
    SubPartTrack => "SUB_PART_TRACK",
    SubPartLepton => "SUB_PART_LEPTON",
    SubPartPhoton => "SUB_PART_PHOTON",
    SubPartBJet => "SUB_PART_BJET",
    SubPartQgJet => "SUB_PART_QGJET",
    SubPartNumet => "SUB_PART_NUMET",
    SubPartMetlv => "SUB_PART_METLV",
    SubPartGen => "SUB_PART_GEN",
    SubPartJet => "SUB_PART_JET",
    SubPartFJet => "SUB_PART_FJET",
    SubPartNamed => "SUB_PART_NAMED",

    // Unions
    MakeEmptyUnion => "MAKE_EMPTY_UNION",
    AddElectronToUnion => "ADD_ELECTRON_TO_UNION",
    AddMuonToUnion => "ADD_MUON_TO_UNION",
    AddTauToUnion => "ADD_TAU_TO_UNION",
    AddTrackToUnion => "ADD_TRACK_TO_UNION",
    AddLeptonToUnion => "ADD_LEPTON_TO_UNION",
    AddPhotonToUnion => "ADD_PHOTON_TO_UNION",
    AddBJetToUnion => "ADD_BJET_TO_UNION",
    AddQgJetToUnion => "ADD_QGJET_TO_UNION",
    AddNumetToUnion => "ADD_NUMET_TO_UNION",
    AddMetlvToUnion => "ADD_METLV_TO_UNION",
    AddGenToUnion => "ADD_GEN_TO_UNION",
    AddJetToUnion => "ADD_JET_TO_UNION",
    AddFJetToUnion => "ADD_FJET_TO_UNION",
    AddNamedToUnion => "ADD_NAMED_TO_UNION",

    // Combinations
    MakeEmptyComb => "MAKE_EMPTY_COMB",
    AddElectronToComb => "ADD_ELECTRON_TO_COMB",
    AddMuonToComb => "ADD_MUON_TO_COMB",
    AddTauToComb => "ADD_TAU_TO_COMB",
    AddTrackToComb => "ADD_TRACK_TO_COMB",
    AddLeptonToComb => "ADD_LEPTON_TO_COMB",
    AddPhotonToComb => "ADD_PHOTON_TO_COMB",
    AddBJetToComb => "ADD_BJET_TO_COMB",
    AddQgJetToComb => "ADD_QGJET_TO_COMB",
    AddNumetToComb => "ADD_NUMET_TO_COMB",
    AddMetlvToComb => "ADD_METLV_TO_COMB",
    AddGenToComb => "ADD_GEN_TO_COMB",
    AddJetToComb => "ADD_JET_TO_COMB",
    AddFJetToComb => "ADD_FJET_TO_COMB",
    AddNamedToComb => "ADD_NAMED_TO_COMB",
    NameElementOfComb => "NAME_ELEMENT_OF_COMB",

    MakeEmptyDisjoint => "MAKE_EMPTY_DISJOINT",
    AddElectronToDisjoint => "ADD_ELECTRON_TO_DISJOINT",
    AddMuonToDisjoint => "ADD_MUON_TO_DISJOINT",
    AddTauToDisjoint => "ADD_TAU_TO_DISJOINT",
    AddTrackToDisjoint => "ADD_TRACK_TO_DISJOINT",
    AddLeptonToDisjoint => "ADD_LEPTON_TO_DISJOINT",
    AddPhotonToDisjoint => "ADD_PHOTON_TO_DISJOINT",
    AddBJetToDisjoint => "ADD_BJET_TO_DISJOINT",
    AddQgJetToDisjoint => "ADD_QGJET_TO_DISJOINT",
    AddNumetToDisjoint => "ADD_NUMET_TO_DISJOINT",
    AddMetlvToDisjoint => "ADD_METLV_TO_DISJOINT",
    AddGenToDisjoint => "ADD_GEN_TO_DISJOINT",
    AddJetToDisjoint => "ADD_JET_TO_DISJOINT",
    AddFJetToDisjoint => "ADD_FJET_TO_DISJOINT",
    AddNamedToDisjoint => "ADD_NAMED_TO_DISJOINT",
    NameElementOfDisjoint => "NAME_ELEMENT_OF_DISJOINT",
}

/// Built-in particle collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Species {
    Electron,
    Muon,
    Tau,
    Track,
    Lepton,
    Photon,
    BJet,
    QgJet,
    Numet,
    Metlv,
    Gen,
    Jet,
    FJet,
}

/// Expands to a lookup from `Option<Species>` to one opcode per species,
/// `None` selecting the named-alias variant
macro_rules! species_table {
    ($species:expr; $($sp:ident => $op:ident,)* _ => $named:ident) => {
        match $species {
            $(Some(Species::$sp) => Opcode::$op,)*
            None => Opcode::$named,
        }
    };
}

impl Opcode {
    /// `ADD_PART_*`; `None` is a named collection
    pub fn add_part(species: Option<Species>) -> Opcode {
        species_table!(species;
            Electron => AddPartElectron,
            Muon => AddPartMuon,
            Tau => AddPartTau,
            Track => AddPartTrack,
            Lepton => AddPartLepton,
            Photon => AddPartPhoton,
            BJet => AddPartBJet,
            QgJet => AddPartQgJet,
            Numet => AddPartNumet,
            Metlv => AddPartMetlv,
            Gen => AddPartGen,
            Jet => AddPartJet,
            FJet => AddPartFJet,
            _ => AddPartNamed)
    }

    /// `SUB_PART_*`; `None` is a named collection
    pub fn sub_part(species: Option<Species>) -> Opcode {
        species_table!(species;
            Electron => SubPartElectron,
            Muon => SubPartMuon,
            Tau => SubPartTau,
            Track => SubPartTrack,
            Lepton => SubPartLepton,
            Photon => SubPartPhoton,
            BJet => SubPartBJet,
            QgJet => SubPartQgJet,
            Numet => SubPartNumet,
            Metlv => SubPartMetlv,
            Gen => SubPartGen,
            Jet => SubPartJet,
            FJet => SubPartFJet,
            _ => SubPartNamed)
    }

    pub fn add_to_union(species: Option<Species>) -> Opcode {
        species_table!(species;
            Electron => AddElectronToUnion,
            Muon => AddMuonToUnion,
            Tau => AddTauToUnion,
            Track => AddTrackToUnion,
            Lepton => AddLeptonToUnion,
            Photon => AddPhotonToUnion,
            BJet => AddBJetToUnion,
            QgJet => AddQgJetToUnion,
            Numet => AddNumetToUnion,
            Metlv => AddMetlvToUnion,
            Gen => AddGenToUnion,
            Jet => AddJetToUnion,
            FJet => AddFJetToUnion,
            _ => AddNamedToUnion)
    }

    pub fn add_to_comb(species: Option<Species>) -> Opcode {
        species_table!(species;
            Electron => AddElectronToComb,
            Muon => AddMuonToComb,
            Tau => AddTauToComb,
            Track => AddTrackToComb,
            Lepton => AddLeptonToComb,
            Photon => AddPhotonToComb,
            BJet => AddBJetToComb,
            QgJet => AddQgJetToComb,
            Numet => AddNumetToComb,
            Metlv => AddMetlvToComb,
            Gen => AddGenToComb,
            Jet => AddJetToComb,
            FJet => AddFJetToComb,
            _ => AddNamedToComb)
    }

    pub fn add_to_disjoint(species: Option<Species>) -> Opcode {
        species_table!(species;
            Electron => AddElectronToDisjoint,
            Muon => AddMuonToDisjoint,
            Tau => AddTauToDisjoint,
            Track => AddTrackToDisjoint,
            Lepton => AddLeptonToDisjoint,
            Photon => AddPhotonToDisjoint,
            BJet => AddBJetToDisjoint,
            QgJet => AddQgJetToDisjoint,
            Numet => AddNumetToDisjoint,
            Metlv => AddMetlvToDisjoint,
            Gen => AddGenToDisjoint,
            Jet => AddJetToDisjoint,
            FJet => AddFJetToDisjoint,
            _ => AddNamedToDisjoint)
    }

    /// Opcodes that open a new group in a listing
    pub fn starts_group(self) -> bool {
        matches!(
            self,
            Opcode::MakeEmptyParticle
                | Opcode::MakeEmptyUnion
                | Opcode::MakeEmptyComb
                | Opcode::MakeEmptyDisjoint
                | Opcode::CreateRegion
                | Opcode::CreateMask
        )
    }

    /// Opcodes that close a group in a listing
    pub fn ends_group(self) -> bool {
        matches!(self, Opcode::EndExpression | Opcode::AddHistToList)
    }
}

impl fmt::Display for Opcode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Opcode {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Instruction operand
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Operand {
    /// A generated IR name or a name declared in the source
    Name(String),
    /// Source text carried verbatim
    Literal(String),
    Index(i64),
}

impl Operand {
    pub fn name(name: impl Into<String>) -> Self {
        Operand::Name(name.into())
    }

    pub fn literal(text: impl Into<String>) -> Self {
        Operand::Literal(text.into())
    }

    pub fn text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Operand {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Operand::Name(name) => f.write_str(name),
            Operand::Literal(text) => f.write_str(text),
            Operand::Index(i) => write!(f, "{}", i),
        }
    }
}

/// One IR instruction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instruction {
    pub opcode: Opcode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest: Option<String>,
    pub args: Vec<Operand>,
    /// Source position of the construct that produced it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl Instruction {
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            dest: None,
            args: Vec::new(),
            span: None,
        }
    }

    pub fn dest(
        mut self,
        dest: impl Into<String>,
    ) -> Self {
        self.dest = Some(dest.into());
        self
    }

    pub fn arg(
        mut self,
        operand: Operand,
    ) -> Self {
        self.args.push(operand);
        self
    }

    pub fn name(
        self,
        name: impl Into<String>,
    ) -> Self {
        self.arg(Operand::name(name))
    }

    pub fn literal(
        self,
        text: impl Into<String>,
    ) -> Self {
        self.arg(Operand::literal(text))
    }

    pub fn index(
        self,
        i: i64,
    ) -> Self {
        self.arg(Operand::Index(i))
    }

    pub fn at(
        mut self,
        span: Span,
    ) -> Self {
        self.span = Some(span);
        self
    }

    /// Number of operands, destination included
    pub fn operand_count(&self) -> usize {
        self.args.len() + usize::from(self.dest.is_some())
    }

    /// Operand `i` as text; operand 0 is the destination when there is one
    pub fn operand(
        &self,
        i: usize,
    ) -> Option<String> {
        match (&self.dest, i) {
            (Some(dest), 0) => Some(dest.clone()),
            (Some(_), i) => self.args.get(i - 1).map(Operand::text),
            (None, i) => self.args.get(i).map(Operand::text),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if let Some(dest) = &self.dest {
            write!(f, "({})  <- ", dest)?;
        }
        f.write_str(self.opcode.name())?;
        for arg in &self.args {
            write!(f, " ({})", arg)?;
        }
        Ok(())
    }
}

/// Lowered program with a forward read cursor
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InstructionStream {
    instructions: Vec<Instruction>,
    #[serde(skip)]
    cursor: usize,
}

impl InstructionStream {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self {
            instructions,
            cursor: 0,
        }
    }

    /// Whether `take` has anything left to return
    pub fn more(&self) -> bool {
        self.cursor < self.instructions.len()
    }

    /// Next instruction, advancing the cursor
    pub fn take(&mut self) -> Option<&Instruction> {
        let instruction = self.instructions.get(self.cursor)?;
        self.cursor += 1;
        Some(instruction)
    }

    /// Move the cursor back to the first instruction
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl<'a> IntoIterator for &'a InstructionStream {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names() {
        assert_eq!(Opcode::FuncMass.name(), "FUNC_M");
        assert_eq!(Opcode::FuncEnergy.name(), "FUNC_E");
        assert_eq!(Opcode::AddPartQgJet.to_string(), "ADD_PART_QGJET");
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<_> = Opcode::ALL.iter().map(|op| op.name()).collect();
        names.sort_unstable();
        let before = names.len();
        names.dedup();
        assert_eq!(names.len(), before);
    }

    #[test]
    fn test_species_helpers() {
        assert_eq!(Opcode::add_part(Some(Species::Jet)), Opcode::AddPartJet);
        assert_eq!(Opcode::sub_part(None), Opcode::SubPartNamed);
        assert_eq!(
            Opcode::add_to_union(Some(Species::Muon)),
            Opcode::AddMuonToUnion
        );
        assert_eq!(Opcode::add_to_comb(None), Opcode::AddNamedToComb);
        assert_eq!(
            Opcode::add_to_disjoint(Some(Species::FJet)),
            Opcode::AddFJetToDisjoint
        );
    }

    #[test]
    fn test_operand_zero_is_dest() {
        let inst = Instruction::new(Opcode::ExprAdd)
            .dest("_V3")
            .name("_V1")
            .literal("2.5");
        assert_eq!(inst.operand_count(), 3);
        assert_eq!(inst.operand(0).as_deref(), Some("_V3"));
        assert_eq!(inst.operand(2).as_deref(), Some("2.5"));
        assert_eq!(inst.operand(3), None);

        let inst = Instruction::new(Opcode::CreateBin).name("c").index(4);
        assert_eq!(inst.operand(0).as_deref(), Some("c"));
        assert_eq!(inst.operand(1).as_deref(), Some("4"));
    }

    #[test]
    fn test_instruction_display() {
        let inst = Instruction::new(Opcode::LimitMask)
            .dest("_L2_MASKJets")
            .name("_MASKJets")
            .name("_V1_MASKJets_COND");
        assert_eq!(
            inst.to_string(),
            "(_L2_MASKJets)  <- LIMIT_MASK (_MASKJets) (_V1_MASKJets_COND)"
        );
        let inst = Instruction::new(Opcode::CreateRegion).name("_REGpre");
        assert_eq!(inst.to_string(), "CREATE_REGION (_REGpre)");
    }

    #[test]
    fn test_cursor() {
        let mut stream = InstructionStream::new(vec![
            Instruction::new(Opcode::CreateRegion).name("_REGa"),
            Instruction::new(Opcode::DoCutflowOnRegion).name("_REGa"),
        ]);
        assert!(stream.more());
        assert_eq!(stream.take().map(|i| i.opcode), Some(Opcode::CreateRegion));
        assert_eq!(
            stream.take().map(|i| i.opcode),
            Some(Opcode::DoCutflowOnRegion)
        );
        assert!(!stream.more());
        assert!(stream.take().is_none());

        stream.rewind();
        assert!(stream.more());
        assert_eq!(stream.len(), 2);
    }

    #[test]
    fn test_json() {
        let stream = InstructionStream::new(vec![Instruction::new(Opcode::AddAlias)
            .dest("x")
            .literal("5")]);
        let json = stream.to_json().unwrap();
        assert!(json.contains("\"opcode\": \"ADD_ALIAS\""));
        assert!(json.contains("\"kind\": \"literal\""));
        assert!(!json.contains("span"));
    }
}
