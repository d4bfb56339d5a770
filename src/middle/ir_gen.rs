//! AST to IR lowering
//!
//! The tree is walked once and instructions are appended to a flat list.
//! Every intermediate result gets a fresh name from a single counter, and
//! each name carries the suffix of the scope it was made in
//! (`_V3_MASKJets`). Nested blocks work on a derived [`Scope`], so an
//! inner scope can never leak back into its parent.
//!
//! Conditionals are not lowered to jumps: `C ? A : B` becomes the guard
//! `(C and A) or (not C and B)`, keeping the stream branch-free.

use indexmap::IndexSet;
use tracing::{debug, trace};

use crate::frontend::core::lexer::{Token, TokenKind};
use crate::frontend::core::parser::ast::{Ast, NodeId, NodeKind};
use crate::middle::ir::{Instruction, InstructionStream, Opcode, Operand, Species};
use crate::util::config::{CompilerConfig, ReportMode};

/// Settings that change what lowering emits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoweringConfig {
    /// Which regions keep their `DO_CUTFLOW_ON_REGION`
    pub cutflow: ReportMode,
    /// Which regions keep their `DO_EVENTLIST_ON_REGION`
    pub eventlist: ReportMode,
}

impl Default for LoweringConfig {
    fn default() -> Self {
        Self {
            cutflow: ReportMode::All,
            eventlist: ReportMode::None,
        }
    }
}

impl From<&CompilerConfig> for LoweringConfig {
    fn from(config: &CompilerConfig) -> Self {
        Self {
            cutflow: config.cutflow,
            eventlist: config.eventlist,
        }
    }
}

/// Lowering failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoweringError {
    /// A node that cannot be lowered in the place it appears
    #[error("Failed to convert \"{lexeme}\", at line {line}, column {column}: {message}")]
    Conversion {
        lexeme: String,
        line: usize,
        column: usize,
        message: String,
    },
    /// A construct the language has but lowering does not support yet
    #[error("No implemented conversion exists for \"{construct}\"")]
    NotImplemented { construct: String },
}

impl LoweringError {
    fn at(
        token: &Token,
        message: impl Into<String>,
    ) -> Self {
        LoweringError::Conversion {
            lexeme: token.lexeme.clone(),
            line: token.line(),
            column: token.column(),
            message: message.into(),
        }
    }

    fn not_implemented(construct: impl Into<String>) -> Self {
        LoweringError::NotImplemented {
            construct: construct.into(),
        }
    }
}

pub type LoweringResult<T> = Result<T, LoweringError>;

/// Lower a parsed analysis to IR
pub fn lower(
    ast: &Ast,
    config: &LoweringConfig,
) -> LoweringResult<InstructionStream> {
    IrGenerator::new(ast, *config).generate()
}

/// Collection an object block selects from
#[derive(Debug, Clone, PartialEq)]
struct Source {
    species: Option<Species>,
    name: String,
}

/// Union or combination member as its `ADD_*_TO_*` operands
#[derive(Debug, Clone, PartialEq)]
struct Member {
    species: Option<Species>,
    named: Option<String>,
    indices: Vec<i64>,
}

impl Member {
    fn append_to(
        self,
        mut add: Instruction,
    ) -> Instruction {
        if let Some(named) = self.named {
            add = add.name(named);
        }
        for index in self.indices {
            add = add.index(index);
        }
        add
    }
}

/// Naming context of the construct being lowered
#[derive(Debug, Clone, Default)]
struct Scope {
    /// Suffix for fresh names
    name: String,
    /// Latest mask limit of the enclosing object
    limit: String,
    /// Latest cut of the enclosing region
    region: String,
    /// Source of the enclosing object, for `this` and bare accessors
    object: Option<Source>,
    /// Members of the enclosing composite, in declaration order
    members: IndexSet<String>,
}

impl Scope {
    fn nested(
        &self,
        name: String,
    ) -> Scope {
        Scope {
            name,
            ..self.clone()
        }
    }

    /// Mask or region a histogram in this scope is booked against
    fn booking_target(&self) -> &str {
        if self.object.is_some() {
            &self.limit
        } else {
            &self.region
        }
    }
}

/// Result of a selection before it is closed by `END_EXPRESSION`
#[derive(Debug, Clone, PartialEq)]
enum Guard {
    All,
    Nothing,
    Value(String),
}

/// Lowering pass over one tree
pub struct IrGenerator<'a> {
    ast: &'a Ast,
    config: LoweringConfig,
    instructions: Vec<Instruction>,
    counter: usize,
}

impl<'a> IrGenerator<'a> {
    pub fn new(
        ast: &'a Ast,
        config: LoweringConfig,
    ) -> Self {
        Self {
            ast,
            config,
            instructions: Vec::new(),
            counter: 0,
        }
    }

    /// Lower the whole tree
    pub fn generate(mut self) -> LoweringResult<InstructionStream> {
        debug!("Lowering {} AST nodes", self.ast.len());

        let mut scope = Scope::default();
        let root = self.ast.root();
        self.visit(root, &mut scope)?;

        let emitted = self.instructions.len();
        let instructions = filter_reports(self.instructions, &self.config);
        debug!(
            "Lowering complete, {} instructions ({} report instructions dropped)",
            instructions.len(),
            emitted - instructions.len()
        );
        Ok(InstructionStream::new(instructions))
    }

    // ------------------------------------------------------------------
    // Names and emission
    // ------------------------------------------------------------------

    fn reserve(
        &mut self,
        prefix: char,
        scope: &Scope,
    ) -> String {
        let name = format!("_{}{}{}", prefix, self.counter, scope.name);
        self.counter += 1;
        name
    }

    fn reserve_value_name(
        &mut self,
        scope: &Scope,
    ) -> String {
        self.reserve('V', scope)
    }

    fn reserve_limit_name(
        &mut self,
        scope: &Scope,
    ) -> String {
        self.reserve('L', scope)
    }

    fn reserve_region_name(
        &mut self,
        scope: &Scope,
    ) -> String {
        self.reserve('R', scope)
    }

    fn emit(
        &mut self,
        node: NodeId,
        mut instruction: Instruction,
    ) {
        if let Some(token) = self.first_token(node) {
            instruction.span = Some(token.span);
        }
        trace!("emit {}", instruction);
        self.instructions.push(instruction);
    }

    /// The node's own token, or the first token below it
    fn first_token(
        &self,
        node: NodeId,
    ) -> Option<&'a Token> {
        let ast = self.ast;
        if let Some(token) = ast.token(node) {
            return Some(token);
        }
        ast.children(node)
            .iter()
            .find_map(|&child| self.first_token(child))
    }

    fn error(
        &self,
        node: NodeId,
        message: &str,
    ) -> LoweringError {
        match self.first_token(node) {
            Some(token) => LoweringError::at(token, message),
            None => LoweringError::Conversion {
                lexeme: self.ast.kind(node).name().to_string(),
                line: 0,
                column: 0,
                message: message.to_string(),
            },
        }
    }

    fn token(
        &self,
        node: NodeId,
    ) -> LoweringResult<&'a Token> {
        self.ast
            .token(node)
            .ok_or_else(|| self.error(node, "Expected a token at this node"))
    }

    fn child(
        &self,
        node: NodeId,
        n: usize,
    ) -> LoweringResult<NodeId> {
        self.ast
            .child(node, n)
            .ok_or_else(|| self.error(node, "Node is missing a required child"))
    }

    /// Declared name held by an id node, quotes stripped
    fn name_of(
        &self,
        node: NodeId,
    ) -> LoweringResult<String> {
        Ok(self.token(node)?.unquoted().to_string())
    }

    fn lexeme_of(
        &self,
        node: NodeId,
    ) -> LoweringResult<String> {
        Ok(self.token(node)?.lexeme.clone())
    }

    fn token_kind(
        &self,
        node: NodeId,
    ) -> Option<TokenKind> {
        self.ast.token(node).map(|token| token.kind)
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn visit(
        &mut self,
        node: NodeId,
        scope: &mut Scope,
    ) -> LoweringResult<()> {
        match self.ast.kind(node) {
            NodeKind::Definition => self.lower_definition(node, scope),
            NodeKind::Object => self.lower_object(node, scope),
            NodeKind::Composite => self.lower_composite(node, scope),
            NodeKind::TableDef => self.lower_table(node, scope),
            NodeKind::Region => self.lower_region(node, scope),
            NodeKind::HistoList => self.lower_histo_list(node, scope),
            NodeKind::Histogram => {
                let target = scope.booking_target().to_string();
                self.lower_histogram(node, scope, Some(target))?;
                Ok(())
            }
            NodeKind::HistoListHistogram => {
                self.lower_histogram(node, scope, None)?;
                Ok(())
            }
            NodeKind::HistoUse => self.lower_histo_use(node, scope),
            NodeKind::ObjectSelect => self.lower_object_select(node, scope),
            NodeKind::ObjectReject => self.lower_object_reject(node, scope),
            NodeKind::RegionSelect => self.lower_region_select(node, scope),
            NodeKind::RegionReject => self.lower_region_reject(node, scope),
            NodeKind::RegionUse => self.lower_use(node, scope),
            NodeKind::WeightCmd => self.lower_weight(node, scope),
            NodeKind::BinCmd => self.lower_bin(node, scope),
            NodeKind::BinsCmd => self.lower_bins(node, scope),
            NodeKind::SortCmd => self.lower_sort(node, scope),
            NodeKind::Condition | NodeKind::IfStatement => {
                self.lower_selection(node, scope)?;
                Ok(())
            }
            NodeKind::Expression | NodeKind::Negate | NodeKind::UserFunction => {
                self.lower_expression(node, scope)?;
                Ok(())
            }
            NodeKind::Input
            | NodeKind::Info
            | NodeKind::CountFormat
            | NodeKind::CountProcess
            | NodeKind::Count
            | NodeKind::VariableList
            | NodeKind::ParticleList
            | NodeKind::ParticleSum
            | NodeKind::NamedParticleList
            | NodeKind::Index
            | NodeKind::Interval
            | NodeKind::Terminal => self.visit_children(node, scope),
        }
    }

    fn visit_children(
        &mut self,
        node: NodeId,
        scope: &mut Scope,
    ) -> LoweringResult<()> {
        for &child in self.ast.children(node) {
            self.visit(child, scope)?;
        }
        Ok(())
    }

    /// `def NAME = VALUE`
    fn lower_definition(
        &mut self,
        node: NodeId,
        scope: &mut Scope,
    ) -> LoweringResult<()> {
        let id = self.child(node, 0)?;
        let rvalue = self.child(node, 1)?;
        let name = self.name_of(id)?;
        let inner = scope.nested(format!("_DEF{}", name));
        trace!("lowering definition {}", name);

        let value = match self.ast.kind(rvalue) {
            NodeKind::VariableList => {
                let mut alias = Instruction::new(Opcode::AddAlias).dest(name);
                for &entry in self.ast.children(rvalue) {
                    let value = self.lower_expression(entry, &inner)?;
                    alias = alias.name(value);
                }
                self.emit(node, alias);
                return Ok(());
            }
            NodeKind::Terminal => match self.token_kind(rvalue) {
                Some(TokenKind::Extern) => {
                    let code = self.lexeme_of(self.child(rvalue, 0)?)?;
                    let external = Instruction::new(Opcode::AddExternal)
                        .dest(name)
                        .literal(code);
                    self.emit(rvalue, external);
                    return Ok(());
                }
                Some(TokenKind::CorrectionLib) => {
                    let file = self.lexeme_of(self.child(rvalue, 0)?)?;
                    let key = self.lexeme_of(self.child(rvalue, 1)?)?;
                    let correction = Instruction::new(Opcode::AddCorrectionLib)
                        .dest(name)
                        .literal(file)
                        .literal(key);
                    self.emit(rvalue, correction);
                    return Ok(());
                }
                Some(TokenKind::Ome) => return Err(LoweringError::not_implemented("OME")),
                Some(TokenKind::Constituents) => {
                    let list = self.child(rvalue, 0)?;
                    self.lower_constituents(rvalue, list, &inner)?
                }
                Some(TokenKind::Add | TokenKind::ParticleKeyword) => {
                    let sum = self.child(rvalue, 0)?;
                    self.lower_collection(sum, &inner)?
                }
                _ => self.lower_expression(rvalue, &inner)?,
            },
            _ => self.lower_expression(rvalue, &inner)?,
        };

        let alias = Instruction::new(Opcode::AddAlias).dest(name).name(value);
        self.emit(node, alias);
        Ok(())
    }

    /// `obj NAME : SOURCE CRITERIA` or `obj NAME : union(...)`
    fn lower_object(
        &mut self,
        node: NodeId,
        scope: &mut Scope,
    ) -> LoweringResult<()> {
        let id = self.child(node, 0)?;
        let source = self.child(node, 1)?;
        let name = self.name_of(id)?;

        if self.token_kind(source) == Some(TokenKind::Union) {
            return self.lower_union(node, &name, source, scope);
        }
        trace!("lowering object {}", name);

        let mask = format!("_MASK{}", name);
        let mut inner = scope.nested(mask.clone());
        let collection = self.lower_collection(source, &inner)?;

        let create = Instruction::new(Opcode::CreateMask)
            .dest(mask.clone())
            .name(collection.clone());
        self.emit(id, create);

        let source = match self.simple_member(source)? {
            Some(Member {
                species,
                named: Some(lexeme),
                indices,
            }) if indices.is_empty() => Source {
                species,
                name: lexeme,
            },
            Some(Member {
                species: Some(species),
                named: None,
                indices,
            }) if indices.is_empty() => Source {
                species: Some(species),
                name: self.lexeme_of(source)?,
            },
            _ => Source {
                species: None,
                name: collection,
            },
        };
        inner.limit = mask;
        inner.object = Some(source.clone());

        for &criterion in &self.ast.children(node)[2..] {
            self.visit(criterion, &mut inner)?;
        }

        let apply = Instruction::new(Opcode::ApplyMask)
            .dest(name)
            .name(inner.limit.clone())
            .name(source.name);
        self.emit(node, apply);
        Ok(())
    }

    fn lower_union(
        &mut self,
        node: NodeId,
        name: &str,
        union: NodeId,
        scope: &Scope,
    ) -> LoweringResult<()> {
        let inner = scope.nested(format!("_UNION{}", name));
        let list = self.child(union, 0)?;

        let mut current = self.reserve_value_name(&inner);
        self.emit(
            union,
            Instruction::new(Opcode::MakeEmptyUnion).dest(current.clone()),
        );

        for &member in self.ast.children(list) {
            let operand = self.member_operand(member, &inner)?;
            let next = self.reserve_limit_name(&inner);
            let opcode = Opcode::add_to_union(operand.species);
            let add = operand.append_to(Instruction::new(opcode).dest(next.clone()).name(current));
            self.emit(member, add);
            current = next;
        }

        let alias = Instruction::new(Opcode::AddAlias)
            .dest(name)
            .name(current);
        self.emit(node, alias);
        Ok(())
    }

    /// `comp NAME : comb|disjoint(P a, P b ...) CRITERIA`
    fn lower_composite(
        &mut self,
        node: NodeId,
        scope: &mut Scope,
    ) -> LoweringResult<()> {
        let id = self.child(node, 0)?;
        let combination = self.child(node, 1)?;
        let name = self.name_of(id)?;
        let list = self.child(combination, 0)?;

        let (prefix, make, name_element): (&str, Opcode, Opcode) =
            match self.token_kind(combination) {
                Some(TokenKind::Comb) => ("_COMB", Opcode::MakeEmptyComb, Opcode::NameElementOfComb),
                Some(TokenKind::Disjoint) => (
                    "_DISJOINT",
                    Opcode::MakeEmptyDisjoint,
                    Opcode::NameElementOfDisjoint,
                ),
                _ => {
                    return Err(self.error(
                        combination,
                        "Invalid input to a composite statement, need either comb or disjoint",
                    ))
                }
            };
        let disjoint = make == Opcode::MakeEmptyDisjoint;
        trace!("lowering composite {}", name);

        let mut inner = scope.nested(format!("{}{}", prefix, name));
        let mut current = self.reserve_value_name(&inner);
        self.emit(combination, Instruction::new(make).dest(current.clone()));

        let pairs: Vec<(NodeId, NodeId)> = self
            .ast
            .children(list)
            .chunks(2)
            .filter_map(|pair| match pair {
                [particle, alias] => Some((*particle, *alias)),
                _ => None,
            })
            .collect();

        let mut aliases = Vec::with_capacity(pairs.len());
        for &(particle, alias) in &pairs {
            let operand = self.member_operand(particle, &inner)?;
            let opcode = if disjoint {
                Opcode::add_to_disjoint(operand.species)
            } else {
                Opcode::add_to_comb(operand.species)
            };
            let next = self.reserve_limit_name(&inner);
            let add = operand.append_to(Instruction::new(opcode).dest(next.clone()).name(current));
            self.emit(particle, add);
            current = next;
            aliases.push((alias, self.name_of(alias)?));
        }

        let alias = Instruction::new(Opcode::AddAlias)
            .dest(name.clone())
            .name(current);
        self.emit(id, alias);

        for (i, (alias_node, alias)) in aliases.iter().enumerate() {
            let element = Instruction::new(name_element)
                .dest(alias.clone())
                .name(name.clone())
                .index(i as i64);
            self.emit(*alias_node, element);
            inner.members.insert(alias.clone());
        }

        let mask = format!("_MASK{}", name);
        let first = aliases
            .first()
            .map(|(_, alias)| alias.clone())
            .ok_or_else(|| self.error(list, "A composite needs at least one member"))?;
        self.emit(
            id,
            Instruction::new(Opcode::CreateMask).dest(mask.clone()).name(first),
        );
        inner.limit = mask;
        inner.object = Some(Source {
            species: None,
            name: name.clone(),
        });

        for &criterion in &self.ast.children(node)[2..] {
            if self.ast.kind(criterion) == NodeKind::Definition {
                self.lower_member(criterion, &mut inner)?;
            } else {
                self.visit(criterion, &mut inner)?;
            }
        }

        for member in &inner.members {
            let apply = Instruction::new(Opcode::ApplyMask)
                .dest(format!("{}->{}", name, member))
                .name(inner.limit.clone())
                .name(member.clone());
            self.emit(node, apply);
        }
        Ok(())
    }

    /// `particle NAME = SUM` inside a composite adds a member
    fn lower_member(
        &mut self,
        node: NodeId,
        scope: &mut Scope,
    ) -> LoweringResult<()> {
        let id = self.child(node, 0)?;
        let keyword = self.child(node, 1)?;
        let sum = self.child(keyword, 0)?;
        let name = self.name_of(id)?;

        let value = self.lower_collection(sum, scope)?;
        let alias = Instruction::new(Opcode::AddAlias)
            .dest(name.clone())
            .name(value);
        self.emit(node, alias);
        scope.members.insert(name);
        Ok(())
    }

    /// `table NAME tabletype T nvars N errors B values...`
    fn lower_table(
        &mut self,
        node: NodeId,
        scope: &mut Scope,
    ) -> LoweringResult<()> {
        const NOT_SQUARE: &str =
            "Invalid table, it is not square: likely at least one row is missing at least one component";

        let id = self.child(node, 0)?;
        let nvars_node = self.child(node, 2)?;
        let errors = self.token_kind(self.child(node, 3)?) == Some(TokenKind::True);
        let nvars_lexeme = self.lexeme_of(nvars_node)?;
        let nvars: usize = nvars_lexeme
            .parse()
            .map_err(|_| self.error(nvars_node, "Only integers are allowed to specify NVars"))?;

        let values = &self.ast.children(node)[4..];
        let width = (if errors { 3 } else { 1 }) + 2 * nvars;
        if values.len() % width != 0 {
            return Err(self.error(nvars_node, NOT_SQUARE));
        }

        let mut previous = self.reserve_value_name(scope);
        self.emit(
            id,
            Instruction::new(Opcode::CreateTable)
                .dest(previous.clone())
                .literal(nvars_lexeme),
        );

        for row in values.chunks(width) {
            let current = self.reserve_value_name(scope);
            let mut value = Instruction::new(Opcode::CreateTableValue).dest(self.reserve_value_name(scope));
            let mut lower =
                Instruction::new(Opcode::CreateTableLowerBounds).dest(self.reserve_value_name(scope));
            let mut upper =
                Instruction::new(Opcode::CreateTableUpperBounds).dest(self.reserve_value_name(scope));

            let value_columns = if errors { 2 } else { 0 };
            for (column, &cell) in row.iter().enumerate() {
                let lexeme = self.lexeme_of(cell)?;
                if column <= value_columns {
                    value = value.literal(lexeme);
                } else if column % 2 == 0 {
                    upper = upper.literal(lexeme);
                } else {
                    lower = lower.literal(lexeme);
                }
            }

            let append = Instruction::new(Opcode::AppendToTable)
                .dest(current.clone())
                .name(previous)
                .name(value.dest.clone().unwrap_or_default())
                .name(lower.dest.clone().unwrap_or_default())
                .name(upper.dest.clone().unwrap_or_default());
            let first = row.first().copied().unwrap_or(node);
            for instruction in [value, lower, upper, append] {
                self.emit(first, instruction);
            }
            previous = current;
        }

        let finish = Instruction::new(Opcode::FinishTable)
            .dest(self.name_of(id)?)
            .name(previous);
        self.emit(id, finish);
        Ok(())
    }

    /// `algo NAME COMMANDS`
    fn lower_region(
        &mut self,
        node: NodeId,
        scope: &mut Scope,
    ) -> LoweringResult<()> {
        let id = self.child(node, 0)?;
        let name = self.name_of(id)?;
        let region = format!("_REG{}", name);
        trace!("lowering region {}", name);

        let mut inner = scope.nested(region.clone());
        inner.region = region.clone();
        inner.limit.clear();
        inner.object = None;
        inner.members.clear();

        self.emit(id, Instruction::new(Opcode::CreateRegion).dest(region));
        for &command in &self.ast.children(node)[1..] {
            self.visit(command, &mut inner)?;
        }

        let current = inner.region;
        self.emit(
            node,
            Instruction::new(Opcode::AddAlias)
                .dest(name)
                .name(current.clone()),
        );
        self.emit(
            node,
            Instruction::new(Opcode::DoCutflowOnRegion).name(current.clone()),
        );
        self.emit(
            node,
            Instruction::new(Opcode::DoEventlistOnRegion).name(current),
        );
        Ok(())
    }

    /// `histolist NAME histo ...`
    fn lower_histo_list(
        &mut self,
        node: NodeId,
        scope: &mut Scope,
    ) -> LoweringResult<()> {
        let id = self.child(node, 0)?;
        let name = self.name_of(id)?;
        let list = format!("_HL{}", name);
        let inner = scope.nested(list.clone());

        self.emit(
            id,
            Instruction::new(Opcode::CreateHistList).dest(list.clone()),
        );
        for &histogram in &self.ast.children(node)[1..] {
            let histogram_name = self.lower_histogram(histogram, &inner, None)?;
            let add = Instruction::new(Opcode::AddHistToList)
                .dest(format!("_H{}", histogram_name))
                .name(list.clone())
                .name(histogram_name);
            self.emit(histogram, add);
        }

        self.emit(
            node,
            Instruction::new(Opcode::AddAlias).dest(name).name(list),
        );
        Ok(())
    }

    /// Emit `HIST_1D`/`HIST_2D`, booked against `target` when given;
    /// returns the histogram's name
    fn lower_histogram(
        &mut self,
        node: NodeId,
        scope: &Scope,
        target: Option<String>,
    ) -> LoweringResult<String> {
        let children = self.ast.children(node);
        let (opcode, binnings) = match children.len() {
            6 => (Opcode::Hist1d, 1),
            10 => (Opcode::Hist2d, 2),
            _ => return Err(self.error(node, "Malformed histogram definition")),
        };

        let name = self.name_of(children[0])?;
        let inner = scope.nested(format!("_H{}", name));
        let inputs_at = 2 + 3 * binnings;

        let mut inputs = Vec::with_capacity(binnings);
        for &input in &children[inputs_at..] {
            inputs.push(self.lower_expression(input, &inner)?);
        }

        let mut histogram = Instruction::new(opcode)
            .name(name.clone())
            .literal(self.description(children[1])?);
        for (axis, input) in inputs.into_iter().enumerate() {
            let binning = 2 + 3 * axis;
            for &bound in &children[binning..binning + 3] {
                histogram = histogram.literal(self.lexeme_of(bound)?);
            }
            histogram = histogram.name(input);
        }
        self.emit(node, histogram);

        if let Some(target) = target {
            let book = Instruction::new(Opcode::UseHist)
                .name(name.clone())
                .name(target);
            self.emit(node, book);
        }
        Ok(name)
    }

    /// A description with its continuation strings
    fn description(
        &self,
        node: NodeId,
    ) -> LoweringResult<String> {
        let mut text = self.lexeme_of(node)?;
        for &more in self.ast.children(node) {
            text.push(' ');
            text.push_str(&self.lexeme_of(more)?);
        }
        Ok(text)
    }

    fn lower_histo_use(
        &mut self,
        node: NodeId,
        scope: &mut Scope,
    ) -> LoweringResult<()> {
        let list = self.name_of(self.child(node, 0)?)?;
        let target = scope.booking_target().to_string();
        self.emit(
            node,
            Instruction::new(Opcode::UseHistList).name(list).name(target),
        );
        Ok(())
    }

    fn lower_object_select(
        &mut self,
        node: NodeId,
        scope: &mut Scope,
    ) -> LoweringResult<()> {
        let condition = self.lower_selection(self.child(node, 0)?, scope)?;
        self.limit_mask(node, condition, scope);
        Ok(())
    }

    fn lower_object_reject(
        &mut self,
        node: NodeId,
        scope: &mut Scope,
    ) -> LoweringResult<()> {
        let condition = self.lower_selection(self.child(node, 0)?, scope)?;
        let condition = self.invert(node, condition, scope);
        self.limit_mask(node, condition, scope);
        Ok(())
    }

    fn limit_mask(
        &mut self,
        node: NodeId,
        condition: Operand,
        scope: &mut Scope,
    ) {
        let limit = self.reserve_limit_name(scope);
        let instruction = Instruction::new(Opcode::LimitMask)
            .dest(limit.clone())
            .name(scope.limit.clone())
            .arg(condition);
        self.emit(node, instruction);
        scope.limit = limit;
    }

    fn lower_region_select(
        &mut self,
        node: NodeId,
        scope: &mut Scope,
    ) -> LoweringResult<()> {
        let condition = self.lower_selection(self.child(node, 0)?, scope)?;
        self.cut_region(node, condition, scope);
        Ok(())
    }

    fn lower_region_reject(
        &mut self,
        node: NodeId,
        scope: &mut Scope,
    ) -> LoweringResult<()> {
        let condition = self.lower_selection(self.child(node, 0)?, scope)?;
        let condition = self.invert(node, condition, scope);
        self.cut_region(node, condition, scope);
        Ok(())
    }

    fn cut_region(
        &mut self,
        node: NodeId,
        condition: Operand,
        scope: &mut Scope,
    ) {
        let cut = self.reserve_limit_name(scope);
        let instruction = Instruction::new(Opcode::CutRegion)
            .dest(cut.clone())
            .name(scope.region.clone())
            .arg(condition);
        self.emit(node, instruction);
        scope.region = cut;
    }

    /// `use NAME` merges another region's selection into this one
    fn lower_use(
        &mut self,
        node: NodeId,
        scope: &mut Scope,
    ) -> LoweringResult<()> {
        let other = self.name_of(self.child(node, 0)?)?;
        let merged = self.reserve_region_name(scope);
        let instruction = Instruction::new(Opcode::MergeRegions)
            .dest(merged.clone())
            .name(other)
            .name(scope.region.clone());
        self.emit(node, instruction);
        scope.region = merged;
        Ok(())
    }

    fn lower_weight(
        &mut self,
        node: NodeId,
        scope: &mut Scope,
    ) -> LoweringResult<()> {
        let id = self.name_of(self.child(node, 0)?)?;
        let value = self.lower_expression(self.child(node, 1)?, scope)?;
        let weighted = self.reserve_limit_name(scope);
        let instruction = Instruction::new(Opcode::WeightApply)
            .dest(weighted.clone())
            .name(scope.region.clone())
            .name(id)
            .name(value);
        self.emit(node, instruction);
        scope.region = weighted;
        Ok(())
    }

    fn lower_bin(
        &mut self,
        node: NodeId,
        scope: &mut Scope,
    ) -> LoweringResult<()> {
        let condition = self.lower_selection(self.child(node, 0)?, scope)?;
        let bin = Instruction::new(Opcode::CreateBin)
            .arg(condition)
            .name(scope.region.clone());
        self.emit(node, bin);
        Ok(())
    }

    /// `bins E v0 v1 ... vn`: one bin per adjacent pair of edges
    fn lower_bins(
        &mut self,
        node: NodeId,
        scope: &mut Scope,
    ) -> LoweringResult<()> {
        let children = self.ast.children(node);
        if children.len() < 3 {
            return Err(self.error(node, "Binning needs at least 2 values to proceed"));
        }

        let value = self.lower_expression(children[0], scope)?;
        for edges in children[1..].windows(2) {
            let lower = self.lexeme_of(edges[0])?;
            let upper = self.lexeme_of(edges[1])?;
            let within = self.reserve_value_name(scope);
            self.emit(
                edges[0],
                Instruction::new(Opcode::ExprWithin)
                    .dest(within.clone())
                    .name(value.clone())
                    .literal(lower)
                    .literal(upper),
            );
            self.emit(
                edges[0],
                Instruction::new(Opcode::CreateBin)
                    .name(within)
                    .name(scope.region.clone()),
            );
        }
        Ok(())
    }

    fn lower_sort(
        &mut self,
        node: NodeId,
        scope: &mut Scope,
    ) -> LoweringResult<()> {
        let value = self.lower_expression(self.child(node, 0)?, scope)?;
        let order = self.child(node, 1)?;
        let opcode = match self.token_kind(order) {
            Some(TokenKind::Ascend) => Opcode::SortAscend,
            _ => Opcode::SortDescend,
        };
        let sorted = self.reserve_value_name(scope);
        self.emit(
            order,
            Instruction::new(opcode).dest(sorted).name(value),
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Selections
    // ------------------------------------------------------------------

    /// Lower a selection and close it with `END_EXPRESSION`; `all` and
    /// `none` come back as literals
    fn lower_selection(
        &mut self,
        node: NodeId,
        scope: &Scope,
    ) -> LoweringResult<Operand> {
        match self.lower_guard(node, scope)? {
            Guard::All => Ok(Operand::literal("ALL")),
            Guard::Nothing => Ok(Operand::literal("NONE")),
            Guard::Value(value) => Ok(Operand::name(self.end_expression(node, value, scope))),
        }
    }

    fn end_expression(
        &mut self,
        node: NodeId,
        value: String,
        scope: &Scope,
    ) -> String {
        let name = format!("{}_COND", self.reserve_value_name(scope));
        self.emit(
            node,
            Instruction::new(Opcode::EndExpression)
                .dest(name.clone())
                .name(value),
        );
        name
    }

    fn invert(
        &mut self,
        node: NodeId,
        condition: Operand,
        scope: &Scope,
    ) -> Operand {
        match condition {
            Operand::Literal(text) if text == "ALL" => Operand::literal("NONE"),
            Operand::Literal(text) if text == "NONE" => Operand::literal("ALL"),
            condition => {
                let inverted = self.reserve_value_name(scope);
                self.emit(
                    node,
                    Instruction::new(Opcode::ExprLogicalNot)
                        .dest(inverted.clone())
                        .arg(condition),
                );
                Operand::name(self.end_expression(node, inverted, scope))
            }
        }
    }

    fn lower_guard(
        &mut self,
        node: NodeId,
        scope: &Scope,
    ) -> LoweringResult<Guard> {
        match self.ast.kind(node) {
            NodeKind::Condition | NodeKind::Expression => {
                self.lower_guard(self.child(node, 0)?, scope)
            }
            NodeKind::IfStatement => match self.ast.children(node) {
                [condition] => self.lower_guard(*condition, scope),
                [condition, then, otherwise] => {
                    let (condition, then, otherwise) = (*condition, *then, *otherwise);
                    self.lower_ternary(node, condition, then, otherwise, scope)
                }
                _ => Err(self.error(node, "Malformed conditional")),
            },
            NodeKind::Terminal => match self.token_kind(node) {
                Some(TokenKind::All) => Ok(Guard::All),
                Some(TokenKind::Nothing) => Ok(Guard::Nothing),
                Some(
                    TokenKind::Print
                    | TokenKind::ApplyPtf
                    | TokenKind::ApplyHm
                    | TokenKind::LepSf
                    | TokenKind::BtagSf,
                ) => Err(LoweringError::not_implemented(self.lexeme_of(node)?)),
                _ => Ok(Guard::Value(self.lower_expression(node, scope)?)),
            },
            _ => Ok(Guard::Value(self.lower_expression(node, scope)?)),
        }
    }

    /// `C ? A : B` as `(C and A) or (not C and B)`
    fn lower_ternary(
        &mut self,
        node: NodeId,
        condition: NodeId,
        then: NodeId,
        otherwise: NodeId,
        scope: &Scope,
    ) -> LoweringResult<Guard> {
        let condition = self.lower_guard(condition, scope)?;
        let then = self.lower_guard(then, scope)?;
        let otherwise = self.lower_guard(otherwise, scope)?;

        let taken = self.guard_and(node, condition.clone(), then, scope);
        let negated = self.guard_not(node, condition, scope);
        let skipped = self.guard_and(node, negated, otherwise, scope);
        Ok(self.guard_or(node, taken, skipped, scope))
    }

    fn guard_and(
        &mut self,
        node: NodeId,
        lhs: Guard,
        rhs: Guard,
        scope: &Scope,
    ) -> Guard {
        match (lhs, rhs) {
            (Guard::Nothing, _) | (_, Guard::Nothing) => Guard::Nothing,
            (Guard::All, other) | (other, Guard::All) => other,
            (Guard::Value(lhs), Guard::Value(rhs)) => {
                Guard::Value(self.binary(node, Opcode::ExprAnd, lhs, rhs, scope))
            }
        }
    }

    fn guard_or(
        &mut self,
        node: NodeId,
        lhs: Guard,
        rhs: Guard,
        scope: &Scope,
    ) -> Guard {
        match (lhs, rhs) {
            (Guard::All, _) | (_, Guard::All) => Guard::All,
            (Guard::Nothing, other) | (other, Guard::Nothing) => other,
            (Guard::Value(lhs), Guard::Value(rhs)) => {
                Guard::Value(self.binary(node, Opcode::ExprOr, lhs, rhs, scope))
            }
        }
    }

    fn guard_not(
        &mut self,
        node: NodeId,
        guard: Guard,
        scope: &Scope,
    ) -> Guard {
        match guard {
            Guard::All => Guard::Nothing,
            Guard::Nothing => Guard::All,
            Guard::Value(value) => {
                let negated = self.reserve_value_name(scope);
                self.emit(
                    node,
                    Instruction::new(Opcode::ExprLogicalNot)
                        .dest(negated.clone())
                        .name(value),
                );
                Guard::Value(negated)
            }
        }
    }

    fn binary(
        &mut self,
        node: NodeId,
        opcode: Opcode,
        lhs: String,
        rhs: String,
        scope: &Scope,
    ) -> String {
        let dest = self.reserve_value_name(scope);
        self.emit(
            node,
            Instruction::new(opcode)
                .dest(dest.clone())
                .name(lhs)
                .name(rhs),
        );
        dest
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// Lower an expression; returns the name holding its value
    fn lower_expression(
        &mut self,
        node: NodeId,
        scope: &Scope,
    ) -> LoweringResult<String> {
        match self.ast.kind(node) {
            NodeKind::Expression | NodeKind::Condition => {
                self.lower_expression(self.child(node, 0)?, scope)
            }
            NodeKind::Negate => {
                let operand = self.lower_expression(self.child(node, 0)?, scope)?;
                Ok(self.unary(node, Opcode::ExprNegate, operand, scope))
            }
            NodeKind::UserFunction => {
                let mut arguments = Vec::new();
                for &argument in self.ast.children(node) {
                    arguments.push(self.lower_expression(argument, scope)?);
                }
                let dest = self.reserve_limit_name(scope);
                let mut call = Instruction::new(Opcode::FuncNamed).dest(dest.clone());
                for argument in arguments {
                    call = call.name(argument);
                }
                call = call.name(self.name_of(node)?);
                self.emit(node, call);
                Ok(dest)
            }
            NodeKind::Terminal => self.lower_terminal_expression(node, scope),
            NodeKind::Interval => Err(self.error(
                node,
                "An interval may only follow within or outside",
            )),
            _ => Err(self.error(node, "Invalid node in an expression")),
        }
    }

    fn lower_terminal_expression(
        &mut self,
        node: NodeId,
        scope: &Scope,
    ) -> LoweringResult<String> {
        let token = self.token(node)?;
        let kind = token.kind;

        if let Some(opcode) = binary_opcode(kind) {
            if kind == TokenKind::Lt
                || kind == TokenKind::Gt
                || kind == TokenKind::Le
                || kind == TokenKind::Ge
            {
                return self.lower_comparison(node, opcode, scope);
            }
            let lhs = self.lower_expression(self.child(node, 0)?, scope)?;
            let rhs = self.lower_expression(self.child(node, 1)?, scope)?;
            return Ok(self.binary(node, opcode, lhs, rhs, scope));
        }

        match kind {
            TokenKind::ArrowIndex => {
                let parent = self.lexeme_of(self.child(node, 0)?)?;
                let member = self.lexeme_of(self.child(node, 1)?)?;
                Ok(format!("{}->{}", parent, member))
            }
            TokenKind::Within | TokenKind::Outside => self.lower_interval(node, scope),
            TokenKind::Not => {
                let operand = self.lower_expression(self.child(node, 0)?, scope)?;
                Ok(self.unary(node, Opcode::ExprLogicalNot, operand, scope))
            }
            TokenKind::DotIndex => {
                let particle = self.child(node, 0)?;
                let function = self.child(node, 1)?;
                let opcode = self
                    .token_kind(function)
                    .and_then(particle_function)
                    .ok_or_else(|| self.error(function, "Undefined particle function"))?;
                let collection = self.lower_collection(particle, scope)?;
                let dest = self.reserve_value_name(scope);
                self.emit(
                    node,
                    Instruction::new(opcode)
                        .dest(dest.clone())
                        .name(collection),
                );
                Ok(dest)
            }
            TokenKind::Sort => {
                let value = self.lower_expression(self.child(node, 0)?, scope)?;
                let opcode = match self.token_kind(self.child(node, 1)?) {
                    Some(TokenKind::Ascend) => Opcode::FuncSortAscend,
                    _ => Opcode::FuncSortDescend,
                };
                Ok(self.numeric_function(node, opcode, vec![value], scope))
            }
            TokenKind::AnyOccurrences => {
                let needle = self.lower_expression(self.child(node, 0)?, scope)?;
                let haystack = self.lower_expression(self.child(node, 1)?, scope)?;
                Ok(self.numeric_function(
                    node,
                    Opcode::FuncAnyOccurrences,
                    vec![needle, haystack],
                    scope,
                ))
            }
            TokenKind::Min | TokenKind::Max => {
                let mut values = Vec::new();
                for &value in self.ast.children(node) {
                    values.push(self.lower_expression(value, scope)?);
                }
                let opcode = match (kind, values.len() > 1) {
                    (TokenKind::Min, false) => Opcode::FuncMin,
                    (TokenKind::Min, true) => Opcode::FuncMinList,
                    (_, false) => Opcode::FuncMax,
                    (_, true) => Opcode::FuncMaxList,
                };
                Ok(self.numeric_function(node, opcode, values, scope))
            }
            TokenKind::FHemisphere
            | TokenKind::FMegajets
            | TokenKind::FMr
            | TokenKind::FMtr
            | TokenKind::TtbarNnlorec => Err(LoweringError::not_implemented(token.lexeme.clone())),
            kind if kind.is_particle_function() => self.lower_particle_function(node, scope),
            kind if kind.is_numeric_function() => {
                let opcode = numeric_function(kind)
                    .ok_or_else(|| self.error(node, "Invalid function acting on an expression"))?;
                let value = self.lower_expression(self.child(node, 0)?, scope)?;
                Ok(self.numeric_function(node, opcode, vec![value], scope))
            }
            kind if kind.is_numeric() || kind.is_event_variable() => {
                let dest = self.reserve_value_name(scope);
                self.emit(
                    node,
                    Instruction::new(Opcode::AddAlias)
                        .dest(dest.clone())
                        .literal(token.lexeme.clone()),
                );
                Ok(dest)
            }
            TokenKind::VarName | TokenKind::Str => {
                let dest = self.reserve_value_name(scope);
                self.emit(
                    node,
                    Instruction::new(Opcode::AddAlias)
                        .dest(dest.clone())
                        .name(token.unquoted()),
                );
                Ok(dest)
            }
            _ => Err(LoweringError::at(token, "Invalid token in an expression")),
        }
    }

    fn unary(
        &mut self,
        node: NodeId,
        opcode: Opcode,
        operand: String,
        scope: &Scope,
    ) -> String {
        let dest = self.reserve_value_name(scope);
        self.emit(
            node,
            Instruction::new(opcode).dest(dest.clone()).name(operand),
        );
        dest
    }

    fn numeric_function(
        &mut self,
        node: NodeId,
        opcode: Opcode,
        values: Vec<String>,
        scope: &Scope,
    ) -> String {
        let dest = self.reserve_limit_name(scope);
        let mut call = Instruction::new(opcode).dest(dest.clone());
        for value in values {
            call = call.name(value);
        }
        self.emit(node, call);
        dest
    }

    /// `<`, `>`, `<=`, `>=`; a comparison chained onto another one is an
    /// interval test on the shared middle operand
    fn lower_comparison(
        &mut self,
        node: NodeId,
        opcode: Opcode,
        scope: &Scope,
    ) -> LoweringResult<String> {
        let lhs = self.child(node, 0)?;
        let rhs = self.child(node, 1)?;
        let chained = |kind: Option<TokenKind>| {
            matches!(
                kind,
                Some(TokenKind::Lt | TokenKind::Gt | TokenKind::Le | TokenKind::Ge)
            )
        };
        let lhs_chained = self.ast.kind(lhs) == NodeKind::Terminal && chained(self.token_kind(lhs));
        let rhs_chained = self.ast.kind(rhs) == NodeKind::Terminal && chained(self.token_kind(rhs));

        let (center, lower, upper) = match (lhs_chained, rhs_chained) {
            (false, false) => {
                let lhs = self.lower_expression(lhs, scope)?;
                let rhs = self.lower_expression(rhs, scope)?;
                return Ok(self.binary(node, opcode, lhs, rhs, scope));
            }
            (true, true) => {
                return Err(self.error(
                    node,
                    "Invalid chained comparison interval, too many comparisons in a row",
                ))
            }
            (true, false) => (self.child(lhs, 1)?, self.child(lhs, 0)?, rhs),
            (false, true) => (self.child(rhs, 0)?, lhs, self.child(rhs, 1)?),
        };

        let center_value = self.lower_expression(center, scope)?;
        let lower = self.lower_expression(lower, scope)?;
        let upper = self.lower_expression(upper, scope)?;
        let dest = self.reserve_value_name(scope);
        self.emit(
            center,
            Instruction::new(Opcode::ExprWithin)
                .dest(dest.clone())
                .name(center_value)
                .name(lower)
                .name(upper),
        );
        Ok(dest)
    }

    /// `x within [lo, hi]` / `x outside [lo, hi]`
    fn lower_interval(
        &mut self,
        node: NodeId,
        scope: &Scope,
    ) -> LoweringResult<String> {
        let opcode = match self.token_kind(node) {
            Some(TokenKind::Outside) => Opcode::ExprOutside,
            _ => Opcode::ExprWithin,
        };
        let value = self.lower_expression(self.child(node, 0)?, scope)?;
        let interval = self.child(node, 1)?;
        if self.ast.kind(interval) != NodeKind::Interval {
            return Err(self.error(node, "An interval must follow this token."));
        }
        let lower = self.lower_expression(self.child(interval, 0)?, scope)?;
        let upper = self.lower_expression(self.child(interval, 1)?, scope)?;

        let dest = self.reserve_value_name(scope);
        self.emit(
            node,
            Instruction::new(opcode)
                .dest(dest.clone())
                .name(value)
                .name(lower)
                .name(upper),
        );
        Ok(dest)
    }

    // ------------------------------------------------------------------
    // Particles
    // ------------------------------------------------------------------

    /// `FUNC_*(dest; particles...)`; without an argument list the function
    /// applies to the enclosing object's source
    fn lower_particle_function(
        &mut self,
        node: NodeId,
        scope: &Scope,
    ) -> LoweringResult<String> {
        let opcode = self
            .token_kind(node)
            .and_then(particle_function)
            .ok_or_else(|| self.error(node, "Undefined particle function"))?;

        let mut particles = Vec::new();
        match self.ast.child(node, 0) {
            Some(list) => {
                for &argument in self.ast.children(list) {
                    particles.push(self.lower_collection(argument, scope)?);
                }
            }
            None => {
                let empty = self.make_empty_particle(node, scope);
                particles.push(self.lower_this(node, &empty, false, scope)?);
            }
        }

        let dest = self.reserve_value_name(scope);
        let mut call = Instruction::new(opcode).dest(dest.clone());
        for particle in particles {
            call = call.name(particle);
        }
        self.emit(node, call);
        Ok(dest)
    }

    fn lower_constituents(
        &mut self,
        node: NodeId,
        list: NodeId,
        scope: &Scope,
    ) -> LoweringResult<String> {
        let mut particles = Vec::new();
        for &argument in self.ast.children(list) {
            particles.push(self.lower_collection(argument, scope)?);
        }
        let dest = self.reserve_value_name(scope);
        let mut call = Instruction::new(Opcode::FuncConstituents).dest(dest.clone());
        for particle in particles {
            call = call.name(particle);
        }
        self.emit(node, call);
        Ok(dest)
    }

    fn make_empty_particle(
        &mut self,
        node: NodeId,
        scope: &Scope,
    ) -> String {
        let empty = self.reserve_value_name(scope);
        self.emit(
            node,
            Instruction::new(Opcode::MakeEmptyParticle).dest(empty.clone()),
        );
        empty
    }

    /// Build a collection from one particle or a particle sum; returns its
    /// name
    fn lower_collection(
        &mut self,
        node: NodeId,
        scope: &Scope,
    ) -> LoweringResult<String> {
        let mut current = self.make_empty_particle(node, scope);
        if self.ast.kind(node) == NodeKind::ParticleSum {
            for &term in self.ast.children(node) {
                current = self.lower_particle(term, &current, false, scope)?;
            }
        } else {
            current = self.lower_particle(node, &current, false, scope)?;
        }
        Ok(current)
    }

    /// Fold one particle term into the collection `previous`
    fn lower_particle(
        &mut self,
        node: NodeId,
        previous: &str,
        subtract: bool,
        scope: &Scope,
    ) -> LoweringResult<String> {
        if self.ast.kind(node) != NodeKind::Terminal {
            return Err(self.error(node, "Invalid particle"));
        }
        let token = self.token(node)?;

        match token.kind {
            TokenKind::Minus => {
                let inner = self.child(node, 0)?;
                self.lower_particle(inner, previous, !subtract, scope)
            }
            TokenKind::This => self.lower_this(node, previous, subtract, scope),
            TokenKind::First | TokenKind::Second | TokenKind::Constituents => {
                let opcode = match token.kind {
                    TokenKind::First => Opcode::FuncFirst,
                    TokenKind::Second => Opcode::FuncSecond,
                    _ => Opcode::FuncConstituents,
                };
                let inner = self.lower_collection(self.child(node, 0)?, scope)?;
                let helper = self.reserve_value_name(scope);
                self.emit(
                    node,
                    Instruction::new(opcode).dest(helper.clone()).name(inner),
                );
                Ok(self.add_particle(node, None, Some(helper), previous, &[], subtract, scope))
            }
            TokenKind::ArrowIndex => {
                let parent = self.lexeme_of(self.child(node, 0)?)?;
                let member = self.lexeme_of(self.child(node, 1)?)?;
                let name = format!("{}->{}", parent, member);
                Ok(self.add_particle(node, None, Some(name), previous, &[], subtract, scope))
            }
            kind => {
                let indices = self.indices(node)?;
                if let Some(species) = species_of(kind) {
                    Ok(self.add_particle(node, Some(species), None, previous, &indices, subtract, scope))
                } else if kind.is_name() {
                    let name = token.unquoted().to_string();
                    Ok(self.add_particle(node, None, Some(name), previous, &indices, subtract, scope))
                } else {
                    Err(LoweringError::at(token, "Invalid particle"))
                }
            }
        }
    }

    fn lower_this(
        &mut self,
        node: NodeId,
        previous: &str,
        subtract: bool,
        scope: &Scope,
    ) -> LoweringResult<String> {
        let source = scope.object.clone().ok_or_else(|| {
            self.error(
                node,
                "A particle must be given explicitly outside of an object block",
            )
        })?;
        let named = match source.species {
            Some(_) => None,
            None => Some(source.name),
        };
        Ok(self.add_particle(node, source.species, named, previous, &[], subtract, scope))
    }

    #[allow(clippy::too_many_arguments)]
    fn add_particle(
        &mut self,
        node: NodeId,
        species: Option<Species>,
        named: Option<String>,
        previous: &str,
        indices: &[i64],
        subtract: bool,
        scope: &Scope,
    ) -> String {
        let opcode = if subtract {
            Opcode::sub_part(species)
        } else {
            Opcode::add_part(species)
        };
        let dest = self.reserve_value_name(scope);
        let mut add = Instruction::new(opcode).dest(dest.clone());
        if let Some(named) = named {
            add = add.name(named);
        }
        add = add.name(previous);
        for &index in indices {
            add = add.index(index);
        }
        self.emit(node, add);
        dest
    }

    /// Integers of a particle's `Index` child, if it has one
    fn indices(
        &self,
        particle: NodeId,
    ) -> LoweringResult<Vec<i64>> {
        let Some(index) = self
            .ast
            .children(particle)
            .iter()
            .copied()
            .find(|&child| self.ast.kind(child) == NodeKind::Index)
        else {
            return Ok(Vec::new());
        };

        self.ast
            .children(index)
            .iter()
            .map(|&at| {
                self.lexeme_of(at)?.parse::<i64>().map_err(|_| {
                    self.error(at, "Only integers are allowed to be used as indices")
                })
            })
            .collect()
    }

    /// Species or name of a plain particle term, with its indices
    fn simple_member(
        &self,
        node: NodeId,
    ) -> LoweringResult<Option<Member>> {
        if self.ast.kind(node) != NodeKind::Terminal
            || self
                .ast
                .children(node)
                .iter()
                .any(|&child| self.ast.kind(child) != NodeKind::Index)
        {
            return Ok(None);
        }
        let Some(token) = self.ast.token(node) else {
            return Ok(None);
        };
        let (species, named) = if let Some(species) = species_of(token.kind) {
            (Some(species), None)
        } else if token.kind.is_name() {
            (None, Some(token.unquoted().to_string()))
        } else {
            return Ok(None);
        };
        Ok(Some(Member {
            species,
            named,
            indices: self.indices(node)?,
        }))
    }

    /// Operand of a union or combination member: the species itself, a
    /// declared name, or a freshly built collection
    fn member_operand(
        &mut self,
        node: NodeId,
        scope: &Scope,
    ) -> LoweringResult<Member> {
        if let Some(member) = self.simple_member(node)? {
            return Ok(member);
        }
        let collection = self.lower_collection(node, scope)?;
        Ok(Member {
            species: None,
            named: Some(collection),
            indices: Vec::new(),
        })
    }
}

/// Drop `DO_CUTFLOW_ON_REGION` / `DO_EVENTLIST_ON_REGION` the configuration
/// does not ask for; `last` keeps only the final occurrence
fn filter_reports(
    instructions: Vec<Instruction>,
    config: &LoweringConfig,
) -> Vec<Instruction> {
    let mut cutflow_seen = false;
    let mut eventlist_seen = false;

    let mut kept: Vec<Instruction> = instructions
        .into_iter()
        .rev()
        .filter(|instruction| match instruction.opcode {
            Opcode::DoCutflowOnRegion => keep_report(config.cutflow, &mut cutflow_seen),
            Opcode::DoEventlistOnRegion => keep_report(config.eventlist, &mut eventlist_seen),
            _ => true,
        })
        .collect();
    kept.reverse();
    kept
}

fn keep_report(
    mode: ReportMode,
    seen: &mut bool,
) -> bool {
    match mode {
        ReportMode::All => true,
        ReportMode::None => false,
        ReportMode::Last => !std::mem::replace(seen, true),
    }
}

fn species_of(kind: TokenKind) -> Option<Species> {
    let species = match kind {
        TokenKind::Electron => Species::Electron,
        TokenKind::Muon => Species::Muon,
        TokenKind::Tau => Species::Tau,
        TokenKind::Track => Species::Track,
        TokenKind::Lepton => Species::Lepton,
        TokenKind::Photon => Species::Photon,
        TokenKind::BJet => Species::BJet,
        TokenKind::QgJet => Species::QgJet,
        TokenKind::Numet => Species::Numet,
        TokenKind::Metlv => Species::Metlv,
        TokenKind::Gen => Species::Gen,
        TokenKind::Jet => Species::Jet,
        TokenKind::FJet => Species::FJet,
        _ => return None,
    };
    Some(species)
}

fn binary_opcode(kind: TokenKind) -> Option<Opcode> {
    let opcode = match kind {
        TokenKind::Raise => Opcode::ExprRaise,
        TokenKind::Multiply => Opcode::ExprMultiply,
        TokenKind::Divide => Opcode::ExprDivide,
        TokenKind::Plus => Opcode::ExprAdd,
        TokenKind::Minus => Opcode::ExprSubtract,
        TokenKind::Lt => Opcode::ExprLt,
        TokenKind::Le => Opcode::ExprLe,
        TokenKind::Gt => Opcode::ExprGt,
        TokenKind::Ge => Opcode::ExprGe,
        TokenKind::Eq => Opcode::ExprEq,
        TokenKind::Ne => Opcode::ExprNe,
        TokenKind::And => Opcode::ExprAnd,
        TokenKind::Or => Opcode::ExprOr,
        TokenKind::Maximize => Opcode::ExprMaximize,
        TokenKind::Minimize => Opcode::ExprMinimize,
        _ => return None,
    };
    Some(opcode)
}

fn numeric_function(kind: TokenKind) -> Option<Opcode> {
    let opcode = match kind {
        TokenKind::AnyOf => Opcode::FuncAnyOf,
        TokenKind::AllOf => Opcode::FuncAllOf,
        TokenKind::Sqrt => Opcode::FuncSqrt,
        TokenKind::Abs => Opcode::FuncAbs,
        TokenKind::Cos => Opcode::FuncCos,
        TokenKind::Sin => Opcode::FuncSin,
        TokenKind::Tan => Opcode::FuncTan,
        TokenKind::Sinh => Opcode::FuncSinh,
        TokenKind::Cosh => Opcode::FuncCosh,
        TokenKind::Tanh => Opcode::FuncTanh,
        TokenKind::Exp => Opcode::FuncExp,
        TokenKind::Log => Opcode::FuncLog,
        TokenKind::Ave => Opcode::FuncAve,
        TokenKind::Sum => Opcode::FuncSum,
        TokenKind::Hstep => Opcode::FuncHstep,
        TokenKind::Delta => Opcode::FuncDelta,
        _ => return None,
    };
    Some(opcode)
}

fn particle_function(kind: TokenKind) -> Option<Opcode> {
    let opcode = match kind {
        TokenKind::LetterE => Opcode::FuncEnergy,
        TokenKind::LetterP | TokenKind::Pt => Opcode::FuncPt,
        TokenKind::Pz => Opcode::FuncPz,
        TokenKind::LetterM | TokenKind::Mass => Opcode::FuncMass,
        TokenKind::MSoftDrop => Opcode::FuncMSoftDrop,
        TokenKind::LetterQ | TokenKind::Charge => Opcode::FuncCharge,
        TokenKind::Flavor => Opcode::FuncFlavor,
        TokenKind::Constituents => Opcode::FuncConstituents,
        TokenKind::PdgId => Opcode::FuncPdgId,
        TokenKind::JetId => Opcode::FuncJetId,
        TokenKind::Idx => Opcode::FuncIdx,
        TokenKind::TauTag => Opcode::FuncTauTag,
        TokenKind::Ctag => Opcode::FuncCTag,
        TokenKind::Btag => Opcode::FuncBTag,
        TokenKind::Dxy => Opcode::FuncDxy,
        TokenKind::Dz => Opcode::FuncDz,
        TokenKind::GenPartIdx => Opcode::FuncGenPartIdx,
        TokenKind::Phi => Opcode::FuncPhi,
        TokenKind::Rap => Opcode::FuncRapidity,
        TokenKind::Eta => Opcode::FuncEta,
        TokenKind::Theta => Opcode::FuncTheta,
        TokenKind::AbsIso => Opcode::FuncAbsIso,
        TokenKind::MiniIso => Opcode::FuncMiniIso,
        TokenKind::IsTight => Opcode::FuncIsTight,
        TokenKind::IsMedium => Opcode::FuncIsMedium,
        TokenKind::IsLoose => Opcode::FuncIsLoose,
        TokenKind::Dr => Opcode::FuncDr,
        TokenKind::Dphi => Opcode::FuncDphi,
        TokenKind::Deta => Opcode::FuncDeta,
        TokenKind::NumOf => Opcode::FuncSize,
        TokenKind::FMt2 => Opcode::FuncFmt2,
        TokenKind::FMtautau => Opcode::FuncTauTau,
        TokenKind::Ht => Opcode::FuncHt,
        TokenKind::Sphericity => Opcode::FuncSphericity,
        TokenKind::Aplanarity => Opcode::FuncAplanarity,
        _ => return None,
    };
    Some(opcode)
}
