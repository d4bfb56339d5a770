//! Keyword table and lexeme classification
//!
//! The table is ordered: the first rule whose spelling matches wins. Most
//! keywords compare case-insensitively; a handful of ADL names (`TRGe`,
//! `sqrtS`, `fMT2`, ...) only match when written exactly.

use once_cell::sync::Lazy;
use regex::Regex;

use super::tokens::TokenKind;

/// One row of the keyword table
#[derive(Debug, Clone, Copy)]
pub struct KeywordRule {
    /// Accepted spellings, upper-case for case-insensitive rules
    pub spellings: &'static [&'static str],
    pub case_sensitive: bool,
    pub kind: TokenKind,
}

impl KeywordRule {
    fn matches(
        &self,
        lexeme: &str,
        upper: &str,
    ) -> bool {
        let candidate = if self.case_sensitive { lexeme } else { upper };
        self.spellings.iter().any(|s| *s == candidate)
    }
}

const fn ci(
    spellings: &'static [&'static str],
    kind: TokenKind,
) -> KeywordRule {
    KeywordRule {
        spellings,
        case_sensitive: false,
        kind,
    }
}

const fn cs(
    spellings: &'static [&'static str],
    kind: TokenKind,
) -> KeywordRule {
    KeywordRule {
        spellings,
        case_sensitive: true,
        kind,
    }
}

use TokenKind as K;

/// Ordered keyword table
pub static KEYWORDS: &[KeywordRule] = &[
    ci(&["DEF", "DEFINE"], K::Def),
    ci(&["ALGORITHM", "ALGO", "REGION"], K::Algo),
    ci(&["HISTOLIST"], K::HistoList),
    ci(&["INFO"], K::AdlInfo),
    ci(&["OBJ", "OBJECT"], K::Obj),
    ci(&["COMP", "COMPOSITE"], K::Comp),
    ci(&["CMD", "CUT", "SELECT"], K::Select),
    ci(&["REJECT"], K::Reject),
    cs(&["TRGe"], K::TrgE),
    cs(&["TRGm"], K::TrgM),
    cs(&["experiment"], K::Experiment),
    cs(&["id"], K::Id),
    ci(&["TITLE"], K::Title),
    cs(&["publication"], K::Publication),
    cs(&["sqrtS"], K::SqrtS),
    cs(&["lumi"], K::Lumi),
    cs(&["arXiv"], K::ArXiv),
    cs(&["hepdata"], K::Hepdata),
    cs(&["doi"], K::Doi),
    cs(&["counts"], K::Counts),
    cs(&["countsformat"], K::CountsFormat),
    cs(&["stat"], K::ErrStat),
    cs(&["syst"], K::ErrSyst),
    cs(&["process"], K::Process),
    ci(&["PARTICLE", "CANDIDATE"], K::ParticleKeyword),
    ci(&["EXTERN", "EXTERNAL"], K::Extern),
    ci(&["CORRECTIONLIB"], K::CorrectionLib),
    cs(&["systematic"], K::Systematic),
    cs(&["ttree"], K::TTree),
    cs(&["weightMc"], K::WeightMc),
    cs(&["weightPileup"], K::WeightPileup),
    cs(&["weightJvt"], K::WeightJvt),
    cs(&["weightLeptonSF"], K::WeightLeptonSf),
    cs(&["weightBTagSF"], K::WeightBtagSf),
    cs(&["RunYear"], K::RunYear),
    cs(&["mcChannelNumber"], K::McChannelNumber),
    ci(&["EVENTNO"], K::EventNo),
    ci(&["RUNNO"], K::RunNo),
    ci(&["LBNO"], K::LbNo),
    cs(&["OME"], K::Ome),
    ci(&["USE"], K::Use),
    ci(&["PRINT"], K::Print),
    ci(&["IF"], K::If),
    ci(&["THEN"], K::Then),
    ci(&["ELSE"], K::Else),
    ci(&["DO"], K::Do),
    ci(&["ON", "TRUE"], K::True),
    ci(&["OFF", "FALSE"], K::False),
    ci(&["NVARS"], K::NVars),
    ci(&["ERRORS"], K::Errors),
    ci(&["TABLETYPE"], K::TableType),
    ci(&["TAKE", "USING"], K::Take),
    ci(&["HISTO", "HIST"], K::Histo),
    ci(&["WEIGHT"], K::Weight),
    ci(&["TABLE"], K::Table),
    ci(&["SKIPHISTOS"], K::SkipHistos),
    ci(&["SKIPEFS"], K::SkipEfs),
    ci(&["GEN"], K::Gen),
    ci(&["ELE", "ELECTRON"], K::Electron),
    ci(&["MUO", "MUON"], K::Muon),
    ci(&["TAU"], K::Tau),
    ci(&["TRK"], K::Track),
    ci(&["PHO", "PHOTON"], K::Photon),
    ci(&["JET"], K::Jet),
    ci(&["FJET", "FATJET"], K::FJet),
    ci(&["QGJET"], K::QgJet),
    cs(&["NUMET"], K::Numet),
    cs(&["METLV"], K::Metlv),
    cs(&["LEP"], K::Lepton),
    ci(&["HLT"], K::Hlt),
    cs(&["BJET"], K::BJet),
    cs(&["MET"], K::Met),
    ci(&["THIS"], K::This),
    cs(&["daughters", "constituents"], K::Constituents),
    ci(&["INDEX"], K::Idx),
    ci(&["BIN"], K::Bin),
    ci(&["BINS"], K::Bins),
    ci(&["METSIG"], K::MetSignif),
    cs(&["applyHM"], K::ApplyHm),
    cs(&["applyPTF", "scalePT"], K::ApplyPtf),
    cs(&["applyEF", "scaleE"], K::ApplyEf),
    cs(&["genPartIdx"], K::GenPartIdx),
    ci(&["UNION"], K::Union),
    ci(&["ALIAS"], K::Alias),
    ci(&["BTAG"], K::Btag),
    ci(&["CTAG"], K::Ctag),
    ci(&["TAUTAG"], K::TauTag),
    ci(&["FLAVOR", "BTAGGER"], K::Flavor),
    ci(&["PDGID", "PDG_ID"], K::PdgId),
    ci(&["JETID"], K::JetId),
    ci(&["STATUSFLAGS"], K::StatusFlags),
    ci(&["ISTIGHT"], K::IsTight),
    ci(&["ISMEDIUM"], K::IsMedium),
    ci(&["ISLOOSE"], K::IsLoose),
    cs(&["fmegajets"], K::FMegajets),
    cs(&["fhemisphere"], K::FHemisphere),
    cs(&["fMR"], K::FMr),
    cs(&["fMTR"], K::FMtr),
    cs(&["fMT2"], K::FMt2),
    cs(&["fMTauTau"], K::FMtautau),
    ci(&["MINIISO"], K::MiniIso),
    ci(&["ABSISO"], K::AbsIso),
    cs(&["dxy"], K::Dxy),
    ci(&["D0"], K::Dxy),
    cs(&["dz"], K::Dz),
    cs(&["m_HF_Classification"], K::HfClassification),
    cs(&["fTTrr"], K::TtbarNnlorec),
    ci(&["PHI"], K::Phi),
    ci(&["ETA"], K::Eta),
    ci(&["RAP"], K::Rap),
    ci(&["CHARGE"], K::Charge),
    ci(&["MASS"], K::Mass),
    ci(&["MSOFTDROP"], K::MSoftDrop),
    ci(&["THETA"], K::Theta),
    ci(&["PT"], K::Pt),
    ci(&["PZ"], K::Pz),
    ci(&["DR", "DELTAR"], K::Dr),
    ci(&["DPHI", "DELTAPHI"], K::Dphi),
    ci(&["DETA", "DELTAETA"], K::Deta),
    ci(&["SIZE", "COUNT", "NUMOF"], K::NumOf),
    ci(&["FHT"], K::Ht),
    cs(&["fAplanarity"], K::Aplanarity),
    cs(&["fSphericity"], K::Sphericity),
    cs(&["LEPsf"], K::LepSf),
    cs(&["bTagSF"], K::BtagSf),
    cs(&["XSLumiCorrSF"], K::XsLumiCorrSf),
    ci(&["ALL"], K::All),
    ci(&["NONE"], K::Nothing),
    ci(&["==", "EQ"], K::Eq),
    ci(&["!=", "NE"], K::Ne),
    ci(&["~!"], K::Maximize),
    ci(&["~="], K::Minimize),
    ci(&["<=", "LE"], K::Le),
    ci(&[">=", "GE"], K::Ge),
    ci(&["<", "LT"], K::Lt),
    ci(&[">", "GT"], K::Gt),
    ci(&["[]"], K::Irg),
    ci(&["]["], K::Erg),
    ci(&["AND", "&&"], K::And),
    ci(&["OR", "||"], K::Or),
    ci(&["NOT"], K::Not),
    ci(&["WITHIN", "IN"], K::Within),
    ci(&["OUTSIDE"], K::Outside),
    ci(&["-"], K::Minus),
    ci(&["+"], K::Plus),
    ci(&["*"], K::Multiply),
    ci(&["/"], K::Divide),
    ci(&["&"], K::Ampersand),
    ci(&["|"], K::Pipe),
    ci(&[":"], K::Colon),
    ci(&["^"], K::Raise),
    ci(&["."], K::DotIndex),
    ci(&["->"], K::ArrowIndex),
    ci(&["("], K::OpenParen),
    ci(&[")"], K::CloseParen),
    ci(&["["], K::OpenBracket),
    ci(&["]"], K::CloseBracket),
    ci(&["{"], K::OpenCurly),
    ci(&["}"], K::CloseCurly),
    ci(&["?"], K::QuestionMark),
    ci(&["="], K::Assign),
    ci(&["_"], K::Underscore),
    ci(&["DESCEND"], K::Descend),
    ci(&["TAN"], K::Tan),
    ci(&["SIN"], K::Sin),
    ci(&["COS"], K::Cos),
    ci(&["SINH"], K::Sinh),
    ci(&["COSH"], K::Cosh),
    ci(&["TANH"], K::Tanh),
    ci(&["EXP"], K::Exp),
    ci(&["LOG"], K::Log),
    ci(&["ABS"], K::Abs),
    ci(&["SQRT"], K::Sqrt),
    ci(&["AVE"], K::Ave),
    ci(&["SUM"], K::Sum),
    ci(&["HSTEP"], K::Hstep),
    ci(&["DELTA"], K::Delta),
    ci(&["ADD"], K::Add),
    ci(&["SAVE"], K::Save),
    ci(&["CSV"], K::Csv),
    ci(&["ANY", "ANYOF"], K::AnyOf),
    ci(&["ALLOF"], K::AllOf),
    ci(&["ASCEND"], K::Ascend),
    ci(&["ANYOCCURRENCES"], K::AnyOccurrences),
    ci(&["SORT"], K::Sort),
    ci(&["COMB"], K::Comb),
    ci(&["DISJOINT"], K::Disjoint),
    ci(&["MIN"], K::Min),
    ci(&["MAX"], K::Max),
    ci(&["FIRST"], K::First),
    ci(&["SECOND"], K::Second),
    ci(&["+-", "-+"], K::Pm),
    ci(&[">>"], K::Bwr),
    ci(&["<<"], K::Bwl),
    ci(&[","], K::Comma),
    ci(&["Q"], K::LetterQ),
    ci(&["E"], K::LetterE),
    ci(&["P"], K::LetterP),
    ci(&["M"], K::LetterM),
];

static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?[0-9]+$").unwrap());
static DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?[0-9]*\.[0-9]+$").unwrap());
static SCIENTIFIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?[0-9]+\.?[0-9]*[Ee][-+]?[0-9]+$").unwrap());
static VARIABLE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").unwrap());
static STRING: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^"[^"]*"$"#).unwrap());
/// Mantissa of a scientific literal up to its exponent marker
static MANTISSA: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?[0-9]+\.?[0-9]*[Ee]$").unwrap());

/// Look a lexeme up in the keyword table
pub fn keyword_from_str(lexeme: &str) -> Option<TokenKind> {
    let upper = lexeme.to_ascii_uppercase();
    KEYWORDS
        .iter()
        .find(|rule| rule.matches(lexeme, &upper))
        .map(|rule| rule.kind)
}

/// Classify a complete lexeme
pub fn classify(lexeme: &str) -> TokenKind {
    if lexeme.starts_with('#') {
        return TokenKind::Comment;
    }
    if !lexeme.is_empty() && lexeme.chars().all(char::is_whitespace) {
        return TokenKind::Space;
    }
    if let Some(kind) = keyword_from_str(lexeme) {
        return kind;
    }
    if INTEGER.is_match(lexeme) {
        TokenKind::Integer
    } else if DECIMAL.is_match(lexeme) {
        TokenKind::Decimal
    } else if SCIENTIFIC.is_match(lexeme) {
        TokenKind::Scientific
    } else if VARIABLE_NAME.is_match(lexeme) {
        TokenKind::VarName
    } else if STRING.is_match(lexeme) {
        TokenKind::Str
    } else {
        TokenKind::Error
    }
}

/// Whether `text` is a scientific mantissa waiting for its exponent
pub fn is_mantissa(text: &str) -> bool {
    MANTISSA.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_rule_wins() {
        // `count` is a NUMOF synonym, `counts` the exact-case counts keyword
        assert_eq!(classify("count"), TokenKind::NumOf);
        assert_eq!(classify("counts"), TokenKind::Counts);
        assert_eq!(classify("COUNTS"), TokenKind::VarName);
    }

    #[test]
    fn test_case_sensitive_entries() {
        assert_eq!(classify("TRGe"), TokenKind::TrgE);
        assert_eq!(classify("trge"), TokenKind::VarName);
        assert_eq!(classify("LEP"), TokenKind::Lepton);
        assert_eq!(classify("lep"), TokenKind::VarName);
        assert_eq!(classify("dxy"), TokenKind::Dxy);
        assert_eq!(classify("d0"), TokenKind::Dxy);
    }

    #[test]
    fn test_spellings_resolve_to_their_rule() {
        for (i, rule) in KEYWORDS.iter().enumerate() {
            for spelling in rule.spellings {
                let upper = spelling.to_ascii_uppercase();
                let first = KEYWORDS
                    .iter()
                    .position(|r| r.matches(spelling, &upper))
                    .unwrap();
                assert!(first <= i);
                assert_eq!(classify(spelling), KEYWORDS[first].kind);
            }
        }
    }

    #[test]
    fn test_numeric_shapes() {
        assert_eq!(classify("42"), TokenKind::Integer);
        assert_eq!(classify("-7"), TokenKind::Integer);
        assert_eq!(classify(".5"), TokenKind::Decimal);
        assert_eq!(classify("-0.25"), TokenKind::Decimal);
        assert_eq!(classify("1e5"), TokenKind::Scientific);
        assert_eq!(classify("-3.14e+2"), TokenKind::Scientific);
        assert_eq!(classify("3."), TokenKind::Error);
    }

    #[test]
    fn test_strings_comments_space() {
        assert_eq!(classify("\"a b c\""), TokenKind::Str);
        assert_eq!(classify("# note"), TokenKind::Comment);
        assert_eq!(classify("  \t"), TokenKind::Space);
        assert_eq!(classify("\"open"), TokenKind::Error);
    }

    #[test]
    fn test_mantissa() {
        assert!(is_mantissa("-3.14e"));
        assert!(is_mantissa("2E"));
        assert!(!is_mantissa("e"));
        assert!(!is_mantissa("3.14"));
    }
}
