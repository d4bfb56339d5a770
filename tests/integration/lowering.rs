//! Lowering tests over whole blocks
//!
//! These check the shape of the stream a backend sees: which opcodes come
//! out, in what order, and how their names thread through.

use adlc::{compile, Instruction, InstructionStream, Opcode, Operand};

fn find(
    stream: &InstructionStream,
    opcode: Opcode,
) -> &Instruction {
    stream
        .iter()
        .find(|i| i.opcode == opcode)
        .unwrap_or_else(|| panic!("no {} in stream", opcode))
}

fn all(
    stream: &InstructionStream,
    opcode: Opcode,
) -> Vec<&Instruction> {
    stream.iter().filter(|i| i.opcode == opcode).collect()
}

#[test]
fn test_union_object() {
    let stream = compile("obj leptons : union(electron, muon, goodTaus)\n").unwrap();
    let ops: Vec<Opcode> = stream.iter().map(|i| i.opcode).collect();
    assert_eq!(
        ops,
        vec![
            Opcode::MakeEmptyUnion,
            Opcode::AddElectronToUnion,
            Opcode::AddMuonToUnion,
            Opcode::AddNamedToUnion,
            Opcode::AddAlias,
        ]
    );

    let named = find(&stream, Opcode::AddNamedToUnion);
    assert_eq!(named.operand(2).as_deref(), Some("goodTaus"));
    let alias = find(&stream, Opcode::AddAlias);
    assert_eq!(alias.dest.as_deref(), Some("leptons"));
    assert_eq!(alias.operand(1), named.operand(0));
}

#[test]
fn test_union_of_indexed_members() {
    let stream = compile("obj leads : union(electron[0], goodMuons[1])\n").unwrap();
    let ops: Vec<Opcode> = stream.iter().map(|i| i.opcode).collect();
    assert_eq!(
        ops,
        vec![
            Opcode::MakeEmptyUnion,
            Opcode::AddElectronToUnion,
            Opcode::AddNamedToUnion,
            Opcode::AddAlias,
        ]
    );

    let electron = find(&stream, Opcode::AddElectronToUnion);
    assert_eq!(electron.args.len(), 2);
    assert_eq!(electron.args[1], Operand::Index(0));

    let named = find(&stream, Opcode::AddNamedToUnion);
    assert_eq!(named.operand(2).as_deref(), Some("goodMuons"));
    assert_eq!(named.args[2], Operand::Index(1));
}

#[test]
fn test_composite_names_members() {
    let stream = compile(
        "comp zcands : comb(muon[0] m1, muon[1] m2)\n  select q(m1) + q(m2) == 0\n",
    )
    .unwrap();

    let muons = all(&stream, Opcode::AddMuonToComb);
    assert_eq!(muons.len(), 2);
    assert_eq!(muons[0].args.last(), Some(&Operand::Index(0)));
    assert_eq!(muons[1].args.last(), Some(&Operand::Index(1)));
    assert!(all(&stream, Opcode::AddNamedToComb).is_empty());
    assert!(all(&stream, Opcode::MakeEmptyParticle).is_empty());
    let names: Vec<_> = all(&stream, Opcode::NameElementOfComb)
        .into_iter()
        .filter_map(|i| i.dest.clone())
        .collect();
    assert_eq!(names, vec!["m1", "m2"]);
    assert!(stream.iter().any(|i| i.opcode == Opcode::FuncCharge));
    let applied: Vec<_> = all(&stream, Opcode::ApplyMask)
        .into_iter()
        .filter_map(|i| i.dest.clone())
        .collect();
    assert_eq!(applied, vec!["zcands->m1", "zcands->m2"]);
}

#[test]
fn test_one_and_two_dimensional_histograms() {
    let stream = compile(
        r#"
histolist kinematics
  histo hpt, "Leading jet pT", 50, 0, 500, pt(jet[0])
  histo hpteta, "pT vs eta", 50, 0, 500, 10, -2.5, 2.5, pt(jet[0]), eta(jet[0])

region sr
  select all
  histo use kinematics
"#,
    )
    .unwrap();

    let one = find(&stream, Opcode::Hist1d);
    assert_eq!(one.args[0], Operand::name("hpt"));
    assert_eq!(one.args[1], Operand::literal("\"Leading jet pT\""));
    assert_eq!(one.args.len(), 6);

    let two = find(&stream, Opcode::Hist2d);
    assert_eq!(two.args.len(), 10);
    assert_eq!(two.args[7], Operand::literal("-2.5"));

    assert_eq!(all(&stream, Opcode::AddHistToList).len(), 2);
    let used = find(&stream, Opcode::UseHistList);
    assert_eq!(used.operand(0).as_deref(), Some("kinematics"));
}

#[test]
fn test_region_histogram_is_booked() {
    let stream = compile(
        "region sr\n  select met > 100\n  histo hmet, \"MET\", 20, 0, 1000, met\n",
    )
    .unwrap();
    let cut = find(&stream, Opcode::CutRegion);
    let book = find(&stream, Opcode::UseHist);
    assert_eq!(book.operand(0).as_deref(), Some("hmet"));
    assert_eq!(book.operand(1), cut.operand(0));
}

#[test]
fn test_table_rows() {
    let stream = compile(
        "table eff\n  tabletype efficiency\n  nvars 1\n  errors false\n  0.5 0 10\n  0.7 10 20\n",
    )
    .unwrap();
    assert_eq!(all(&stream, Opcode::CreateTable).len(), 1);
    assert_eq!(all(&stream, Opcode::AppendToTable).len(), 2);
    let lows: Vec<_> = all(&stream, Opcode::CreateTableLowerBounds)
        .into_iter()
        .map(|i| i.args.clone())
        .collect();
    assert_eq!(lows, vec![vec![Operand::literal("0")], vec![Operand::literal("10")]]);
    assert_eq!(find(&stream, Opcode::FinishTable).args.len(), 1);
}

#[test]
fn test_region_sort_and_merge() {
    let stream = compile(
        "region base\n  select all\n\nregion sr\n  use base\n  sort pt(jet[0]) descend\n",
    )
    .unwrap();
    let merge = find(&stream, Opcode::MergeRegions);
    assert_eq!(merge.operand(1).as_deref(), Some("base"));
    assert!(merge.dest.as_deref().unwrap().starts_with("_R"));

    let sort = find(&stream, Opcode::SortDescend);
    assert_eq!(sort.operand(1), find(&stream, Opcode::FuncPt).operand(0));
}

#[test]
fn test_every_value_is_written_before_read() {
    let stream = compile(
        r#"
def ht = pt(jet[0]) + pt(jet[1])
obj goodJets : jet
  select pt > 30 and abs(eta) < 2.4
region sr
  select size(goodJets) >= 2 and ht > 400
  select met > 50 ? mjj > 200 : all
"#,
    )
    .unwrap();

    let mut written = std::collections::HashSet::new();
    for instruction in &stream {
        for arg in &instruction.args {
            if let Operand::Name(name) = arg {
                if name.starts_with("_V") || name.starts_with("_L") {
                    assert!(written.contains(name), "{} read before written", name);
                }
            }
        }
        if let Some(dest) = &instruction.dest {
            written.insert(dest.clone());
        }
    }
}
