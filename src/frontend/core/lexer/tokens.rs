//! Token types

use crate::util::span::Span;

/// Lexer error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexError {
    #[error("Malformed token \"{lexeme}\", at line {line}, column {column}")]
    MalformedToken {
        lexeme: String,
        line: usize,
        column: usize,
    },
    #[error("Unterminated string {lexeme}, starting at line {line}, column {column}")]
    UnterminatedString {
        lexeme: String,
        line: usize,
        column: usize,
    },
}

impl LexError {
    /// Line of the offending lexeme
    pub fn line(&self) -> usize {
        match self {
            LexError::MalformedToken { line, .. } | LexError::UnterminatedString { line, .. } => {
                *line
            }
        }
    }

    /// Column of the offending lexeme
    pub fn column(&self) -> usize {
        match self {
            LexError::MalformedToken { column, .. }
            | LexError::UnterminatedString { column, .. } => *column,
        }
    }
}

macro_rules! token_kinds {
    ($($(#[$meta:meta])* $variant:ident => $name:literal,)*) => {
        /// Token kind
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum TokenKind {
            $($(#[$meta])* $variant,)*
        }

        impl TokenKind {
            /// Upper-case name used in listings and diagnostics
            pub fn name(self) -> &'static str {
                match self {
                    $(TokenKind::$variant => $name,)*
                }
            }
        }
    };
}

token_kinds! {
    // Lexer bookkeeping
    Error => "LEXER_ERROR",
    Comment => "LEXER_COMMENT",
    Space => "LEXER_SPACE",
    Newline => "LEXER_NEWLINE",
    Eof => "LEXER_END_OF_FILE",

    // Literals
    Integer => "INTEGER",
    Decimal => "DECIMAL",
    Scientific => "SCIENTIFIC",
    Str => "STRING",
    VarName => "VARIABLE_NAME",

    // Block keywords
    Def => "DEFINITION",
    Algo => "REGION",
    HistoList => "HISTOLIST",
    AdlInfo => "ADLINFO",
    Obj => "OBJECT",
    Comp => "COMPOSITE",
    Select => "SELECT",
    Reject => "REJECT",

    // Info block fields
    TrgE => "TRGE",
    TrgM => "TRGM",
    Experiment => "EXPERIMENT",
    Id => "ID",
    Title => "TITLE",
    Publication => "PUBLICATION",
    SqrtS => "SQRTS",
    Lumi => "LUMI",
    ArXiv => "ARXIV",
    Hepdata => "HEPDATA",
    Doi => "DOI",
    Counts => "COUNTS",
    CountsFormat => "COUNTSFORMAT",
    ErrStat => "ERR_STAT",
    ErrSyst => "ERR_SYST",
    Process => "PROCESS",

    ParticleKeyword => "PARTICLE_KEYWORD",
    Extern => "EXTERN",
    CorrectionLib => "CORRECTIONLIB",

    // Systematics and event information
    Systematic => "SYSTEMATIC",
    TTree => "TTREE",
    WeightMc => "WEIGHT_MC",
    WeightPileup => "WEIGHT_PILEUP",
    WeightJvt => "WEIGHT_JVT",
    WeightLeptonSf => "WEIGHT_LEPTON_SF",
    WeightBtagSf => "WEIGHT_BTAG_SF",
    RunYear => "RUNYEAR",
    McChannelNumber => "MC_CHANNEL_NUMBER",
    EventNo => "EVENT_NO",
    RunNo => "RUN_NO",
    LbNo => "LB_NO",
    Ome => "OME",

    // Commands
    Use => "USE",
    Print => "PRINT",
    If => "IF",
    Then => "THEN",
    Else => "ELSE",
    Do => "DO",
    True => "TRUE",
    False => "FALSE",
    NVars => "NVARS",
    Errors => "ERRORS",
    TableType => "TABLETYPE",
    Take => "TAKE",
    Histo => "HISTO",
    Weight => "WEIGHT",
    Table => "TABLE",
    SkipHistos => "SKIPHISTOS",
    SkipEfs => "SKIPEFS",

    // Particle species
    Gen => "GEN",
    Electron => "ELECTRON",
    Muon => "MUON",
    Tau => "TAU",
    Track => "TRACK",
    Photon => "PHOTON",
    Jet => "JET",
    FJet => "FJET",
    QgJet => "QGJET",
    Numet => "NUMET",
    Metlv => "METLV",
    Lepton => "LEPTON",
    Hlt => "HLT",
    BJet => "BJET",
    Met => "MET",

    This => "THIS",
    Constituents => "CONSTITUENTS",
    Idx => "INDEX",
    Bin => "BIN",
    Bins => "BINS",
    MetSignif => "METSIGNIF",

    ApplyHm => "APPLY_HM",
    ApplyPtf => "APPLY_PTF",
    ApplyEf => "APPLY_EF",
    GenPartIdx => "GENPART_IDX",

    // Object properties
    Union => "UNION",
    Alias => "ALIAS",
    Btag => "BTAG",
    Ctag => "CTAG",
    TauTag => "TAUTAG",
    Flavor => "FLAVOR",
    PdgId => "PDG_ID",
    JetId => "JET_ID",
    StatusFlags => "STATUS_FLAGS",
    IsTight => "IS_TIGHT",
    IsMedium => "IS_MEDIUM",
    IsLoose => "IS_LOOSE",

    // Event-level functions
    FMegajets => "FMEGAJETS",
    FHemisphere => "FHEMISPHERE",
    FMr => "FMR",
    FMtr => "FMTR",
    FMt2 => "FMT2",
    FMtautau => "FMTAUTAU",
    MiniIso => "MINIISO",
    AbsIso => "ABSISO",
    Dxy => "DXY",
    Dz => "DZ",
    HfClassification => "HF_CLASSIFICATION",
    TtbarNnlorec => "TTBAR_NNLOREC",

    // Kinematics
    Phi => "PHI",
    Eta => "ETA",
    Rap => "RAPIDITY",
    Charge => "CHARGE",
    Mass => "MASS",
    MSoftDrop => "MSOFTDROP",
    Theta => "THETA",
    Pt => "PT",
    Pz => "PZ",
    Dr => "DR",
    Dphi => "DPHI",
    Deta => "DETA",
    NumOf => "NUMOF",
    Ht => "HT",
    Aplanarity => "APLANARITY",
    Sphericity => "SPHERICITY",
    LepSf => "LEPSF",
    BtagSf => "BTAGSF",
    XsLumiCorrSf => "XSLUMICORRSF",

    All => "ALL",
    /// The `none` keyword
    Nothing => "NONE",

    // Comparison and logic
    Eq => "EQ",
    Ne => "NE",
    Maximize => "MAXIMIZE",
    Minimize => "MINIMIZE",
    Le => "LE",
    Ge => "GE",
    Lt => "LT",
    Gt => "GT",
    Irg => "IRG",
    Erg => "ERG",
    And => "AND",
    Or => "OR",
    Not => "NOT",
    Within => "WITHIN",
    Outside => "OUTSIDE",

    // Arithmetic and punctuation
    Minus => "MINUS",
    Plus => "PLUS",
    Multiply => "MULTIPLY",
    Divide => "DIVIDE",
    Ampersand => "AMPERSAND",
    Pipe => "PIPE",
    Colon => "COLON",
    Raise => "RAISE",
    DotIndex => "DOT_INDEX",
    ArrowIndex => "ARROW_INDEX",
    OpenParen => "OPEN_PAREN",
    CloseParen => "CLOSE_PAREN",
    OpenBracket => "OPEN_BRACKET",
    CloseBracket => "CLOSE_BRACKET",
    OpenCurly => "OPEN_CURLY",
    CloseCurly => "CLOSE_CURLY",
    QuestionMark => "QUESTION_MARK",
    Assign => "ASSIGN",
    Underscore => "UNDERSCORE",

    // Numeric and list functions
    Descend => "DESCEND",
    Tan => "TAN",
    Sin => "SIN",
    Cos => "COS",
    Sinh => "SINH",
    Cosh => "COSH",
    Tanh => "TANH",
    Exp => "EXP",
    Log => "LOG",
    Abs => "ABS",
    Sqrt => "SQRT",
    Ave => "AVE",
    Sum => "SUM",
    Hstep => "HSTEP",
    Delta => "DELTA",
    Add => "ADD",
    Save => "SAVE",
    Csv => "CSV",
    AnyOf => "ANYOF",
    AllOf => "ALLOF",
    Ascend => "ASCEND",
    AnyOccurrences => "ANYOCCURRENCES",
    Sort => "SORT",
    Comb => "COMB",
    Disjoint => "DISJOINT",
    Min => "MIN",
    Max => "MAX",
    First => "FIRST",
    Second => "SECOND",

    Pm => "PM",
    Bwr => "BWR",
    Bwl => "BWL",
    Comma => "COMMA",

    // Single-letter accessors
    LetterQ => "LETTER_Q",
    LetterE => "LETTER_E",
    LetterP => "LETTER_P",
    LetterM => "LETTER_M",
}

impl TokenKind {
    /// Comments, whitespace and line breaks never reach the parser
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Comment | TokenKind::Space | TokenKind::Newline | TokenKind::Error
        )
    }

    /// Integer, decimal or scientific literal
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            TokenKind::Integer | TokenKind::Decimal | TokenKind::Scientific
        )
    }

    /// Built-in particle collections
    pub fn is_particle_species(self) -> bool {
        matches!(
            self,
            TokenKind::Gen
                | TokenKind::Electron
                | TokenKind::Muon
                | TokenKind::Tau
                | TokenKind::Track
                | TokenKind::Lepton
                | TokenKind::Photon
                | TokenKind::BJet
                | TokenKind::QgJet
                | TokenKind::Numet
                | TokenKind::Metlv
                | TokenKind::Jet
                | TokenKind::FJet
        )
    }

    /// Tokens that can name something: identifiers and quoted strings
    pub fn is_name(self) -> bool {
        matches!(self, TokenKind::VarName | TokenKind::Str)
    }

    /// Keywords that open a top-level block
    pub fn is_block_start(self) -> bool {
        matches!(
            self,
            TokenKind::AdlInfo
                | TokenKind::CountsFormat
                | TokenKind::Def
                | TokenKind::Table
                | TokenKind::Obj
                | TokenKind::Comp
                | TokenKind::Algo
                | TokenKind::HistoList
        )
    }

    /// One-argument functions over a numeric expression
    pub fn is_numeric_function(self) -> bool {
        matches!(
            self,
            TokenKind::AnyOf
                | TokenKind::AllOf
                | TokenKind::Sqrt
                | TokenKind::Abs
                | TokenKind::Cos
                | TokenKind::Sin
                | TokenKind::Tan
                | TokenKind::Sinh
                | TokenKind::Cosh
                | TokenKind::Tanh
                | TokenKind::Exp
                | TokenKind::Log
                | TokenKind::Ave
                | TokenKind::Sum
                | TokenKind::Hstep
                | TokenKind::Delta
        )
    }

    /// Accessors applied to a particle list (`pt(jet)`, `{ele[0]}m`, `jets.eta`)
    pub fn is_particle_function(self) -> bool {
        matches!(
            self,
            TokenKind::LetterE
                | TokenKind::LetterP
                | TokenKind::LetterM
                | TokenKind::LetterQ
                | TokenKind::Charge
                | TokenKind::Mass
                | TokenKind::Flavor
                | TokenKind::Constituents
                | TokenKind::PdgId
                | TokenKind::JetId
                | TokenKind::Idx
                | TokenKind::TauTag
                | TokenKind::Ctag
                | TokenKind::Btag
                | TokenKind::Dxy
                | TokenKind::Dz
                | TokenKind::GenPartIdx
                | TokenKind::Phi
                | TokenKind::Rap
                | TokenKind::Eta
                | TokenKind::MSoftDrop
                | TokenKind::Theta
                | TokenKind::MiniIso
                | TokenKind::AbsIso
                | TokenKind::IsTight
                | TokenKind::IsMedium
                | TokenKind::IsLoose
                | TokenKind::Pt
                | TokenKind::Pz
                | TokenKind::Dr
                | TokenKind::Dphi
                | TokenKind::Deta
                | TokenKind::NumOf
                | TokenKind::Ht
                | TokenKind::FMt2
                | TokenKind::FMtautau
                | TokenKind::Aplanarity
                | TokenKind::Sphericity
        )
    }

    /// Event-level values usable as bare expressions
    pub fn is_event_variable(self) -> bool {
        matches!(
            self,
            TokenKind::MetSignif
                | TokenKind::All
                | TokenKind::Nothing
                | TokenKind::TrgM
                | TokenKind::TrgE
                | TokenKind::EventNo
                | TokenKind::RunNo
                | TokenKind::LbNo
                | TokenKind::McChannelNumber
                | TokenKind::HfClassification
                | TokenKind::RunYear
        )
    }

    /// `<`, `>`, `<=`, `>=`, `==`, `!=`
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            TokenKind::Lt
                | TokenKind::Gt
                | TokenKind::Le
                | TokenKind::Ge
                | TokenKind::Eq
                | TokenKind::Ne
        )
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Token
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text exactly as written
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    pub fn new(
        kind: TokenKind,
        lexeme: impl Into<String>,
        span: Span,
    ) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            span,
        }
    }

    /// Line of the first character (1-indexed)
    pub fn line(&self) -> usize {
        self.span.start.line
    }

    /// Column of the first character (1-indexed)
    pub fn column(&self) -> usize {
        self.span.start.column
    }

    /// Lexeme without surrounding double quotes
    pub fn unquoted(&self) -> &str {
        let text = self.lexeme.as_str();
        text.strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
            .unwrap_or(text)
    }
}
