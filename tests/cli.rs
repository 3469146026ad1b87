use assert_cmd::Command;
use assert_fs::prelude::*;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use predicates::prelude::*;
use std::io::{Read, Write};

const BINARY: &str = "deseqkit";
type TestResult = Result<(), Box<dyn std::error::Error>>;

const DESEQ2_HEADER: &str = ",baseMean,log2FoldChange,lfcSE,stat,pvalue,padj";

fn fastq(records: &[(&str, &str)]) -> String {
    records
        .iter()
        .map(|(id, seq)| format!("{id}\n{seq}\n+\n{}\n", "I".repeat(seq.len())))
        .collect()
}

fn write_gz(child: &assert_fs::fixture::ChildPath, contents: &str) -> TestResult {
    let mut gz = GzEncoder::new(std::fs::File::create(child.path())?, Compression::default());
    gz.write_all(contents.as_bytes())?;
    gz.finish()?;
    Ok(())
}

fn read_gz(child: &assert_fs::fixture::ChildPath) -> Result<String, Box<dyn std::error::Error>> {
    let mut out = String::new();
    MultiGzDecoder::new(std::fs::File::open(child.path())?).read_to_string(&mut out)?;
    Ok(out)
}

#[test]
fn clean_removes_invalid_reads() -> TestResult {
    let temp = assert_fs::TempDir::new()?;
    let input = temp.child("S_R1.fastq.gz");

    let valid = [("@good1", "ACGTNACGTNACGTNACGTN"), ("@good2", "GGGGGGGGGGGGGGGGGGGGGGG")];
    let all = [
        valid[0],
        ("@short", "ACGTACGTACGTACGTACG"),
        ("@delim", "ACGTACGTAC===ACGTACGTAC"),
        valid[1],
        ("@bad", "ACGTACGTACGTACGTACGTXX"),
    ];
    write_gz(&input, &fastq(&all))?;

    Command::cargo_bin(BINARY)?
        .arg("clean")
        .arg(input.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\t5\t2\t3\t1\t1\t1"))
        .stderr(predicate::str::contains("@short"));

    let output = temp.child("S_R1-clean.fastq.gz");
    output.assert(predicate::path::exists());
    assert_eq!(read_gz(&output)?, fastq(&valid));

    Ok(())
}

#[test]
fn clean_is_idempotent() -> TestResult {
    let temp = assert_fs::TempDir::new()?;
    let contents = fastq(&[("@r1", "ACGTACGTACGTACGTACGT"), ("@r2", "NNNNNACGTACGTACGTACGTACG")]);
    let input = temp.child("clean.fastq");
    input.write_str(&contents)?;
    let report = temp.child("report.json");

    Command::cargo_bin(BINARY)?
        .arg("clean")
        .arg(input.path())
        .arg("-o")
        .arg(temp.child("again.fastq").path())
        .arg("--report")
        .arg(report.path())
        .assert()
        .success();

    assert_eq!(std::fs::read_to_string(temp.child("again.fastq").path())?, contents);
    report.assert(predicate::str::contains("\"removed_reads\": 0"));

    Ok(())
}

#[test]
fn clean_sample_pair() -> TestResult {
    let temp = assert_fs::TempDir::new()?;
    let reads = fastq(&[("@r1", "ACGTACGTACGTACGTACGTA")]);
    write_gz(&temp.child("MUT-CR-1_R1.fastq.gz"), &reads)?;
    write_gz(&temp.child("MUT-CR-1_R2.fastq.gz"), &reads)?;

    Command::cargo_bin(BINARY)?
        .current_dir(temp.path())
        .args(["clean", "--sample", "MUT-CR-1"])
        .assert()
        .success();

    assert_eq!(read_gz(&temp.child("MUT-CR-1_R1-clean.fastq.gz"))?, reads);
    assert_eq!(read_gz(&temp.child("MUT-CR-1_R2-clean.fastq.gz"))?, reads);

    Ok(())
}

#[test]
fn clean_output_needs_single_input() -> TestResult {
    Command::cargo_bin(BINARY)?
        .args(["clean", "a.fastq", "b.fastq", "-o", "out.fastq"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("single input"));

    Ok(())
}

#[test]
fn clean_keeps_input_when_output_is_the_same_file() -> TestResult {
    let temp = assert_fs::TempDir::new()?;
    let contents = fastq(&[("@r1", "ACGTACGTACGTACGTACGT"), ("@r2", "ACGT")]);
    let input = temp.child("reads.fastq");
    input.write_str(&contents)?;

    Command::cargo_bin(BINARY)?
        .current_dir(temp.path())
        .args(["clean", "reads.fastq", "-o"])
        .arg(input.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("same file"));

    assert_eq!(std::fs::read_to_string(input.path())?, contents);

    Ok(())
}

#[test]
fn file_doesnt_exist() -> TestResult {
    Command::cargo_bin(BINARY)?
        .args(["clean", "file_which_does_not_exist.fastq.gz"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No such file or directory"));

    Ok(())
}

#[test]
fn volcano_without_input_fails() -> TestResult {
    Command::cargo_bin(BINARY)?
        .arg("volcano")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage"));

    Ok(())
}

#[test]
fn volcano_missing_columns() -> TestResult {
    let temp = assert_fs::TempDir::new()?;
    let input = temp.child("bad.csv");
    input.write_str(",baseMean,log2FoldChange,padj\ng1,10,2.0,0.01\n")?;

    Command::cargo_bin(BINARY)?
        .arg("volcano")
        .arg(input.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Missing required columns"));

    temp.child("bad.svg").assert(predicate::path::missing());

    Ok(())
}

#[test]
fn volcano_classifies_genes() -> TestResult {
    let temp = assert_fs::TempDir::new()?;
    let input = temp.child("deseq2.csv");
    input.write_str(&format!(
        "{DESEQ2_HEADER}\n\
        g1,10,2.0,0.1,1,0.001,0.01\n\
        g2,10,-2.0,0.1,1,0.001,0.01\n\
        g3,10,0.1,0.1,1,0.9,0.95\n"
    ))?;
    let summary = temp.child("summary.json");

    Command::cargo_bin(BINARY)?
        .arg("volcano")
        .arg(input.path())
        .arg("--summary")
        .arg(summary.path())
        .assert()
        .success();

    let plot = temp.child("deseq2.svg");
    plot.assert(predicate::str::contains("Upregulated: 1"));
    plot.assert(predicate::str::contains("Downregulated: 1"));
    plot.assert(predicate::str::contains(">g1</text>"));

    let summary: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(summary.path())?)?;
    assert_eq!(summary["upregulated"], 1);
    assert_eq!(summary["downregulated"], 1);
    assert_eq!(summary["labelled"], serde_json::json!(["g1", "g2"]));

    Ok(())
}

#[test]
fn volcano_top_n_preset() -> TestResult {
    let temp = assert_fs::TempDir::new()?;
    let input = temp.child("deseq2.csv");
    let rows: String = (1..=60)
        .map(|i| format!("up{i},10,{}.0,0.1,1,0.001,0.01\n", i + 1))
        .collect();
    input.write_str(&format!("{DESEQ2_HEADER}\n{rows}low,10,0.8,0.1,1,0.001,0.01\n"))?;
    let output = temp.child("plot.svg");

    Command::cargo_bin(BINARY)?
        .arg("volcano")
        .arg(input.path())
        .args(["--preset", "top-n", "--top-n", "5", "-o"])
        .arg(output.path())
        .assert()
        .success();

    // 0.8 is below the top-n fold change threshold of 1.0
    output.assert(predicate::str::contains("Upregulated: 60"));
    output.assert(predicate::str::contains(">up60</text>"));
    output.assert(predicate::str::contains(">up55</text>").not());
    output.assert(predicate::str::contains(">low</text>").not());

    Ok(())
}

fn ranked_table(genes: &[(&str, f64)]) -> String {
    genes
        .iter()
        .map(|(id, fc)| format!("{id},x,{fc},x,x,0.01\n"))
        .collect()
}

#[test]
fn venn_disjoint_sets_print_nothing() -> TestResult {
    let temp = assert_fs::TempDir::new()?;
    let a = temp.child("a.csv");
    let b = temp.child("b.csv");
    a.write_str(&ranked_table(&[("g1", -2.0), ("g2", -1.0), ("g3", 1.0)]))?;
    b.write_str(&ranked_table(&[("h1", 2.0), ("h2", 1.0), ("g1", -1.0)]))?;
    let output = temp.child("venn.svg");

    Command::cargo_bin(BINARY)?
        .arg("venn")
        .arg(a.path())
        .arg(b.path())
        .arg("-o")
        .arg(output.path())
        .assert()
        .success()
        .stdout("");

    output.assert(predicate::path::exists());

    Ok(())
}

#[test]
fn venn_identical_sets_print_every_gene_once() -> TestResult {
    let temp = assert_fs::TempDir::new()?;
    let a = temp.child("a.csv");
    let b = temp.child("b.csv");
    a.write_str(&format!(
        "id,x,log2FoldChange,x,x,pvalue\n{}",
        ranked_table(&[("g3", -3.0), ("g1", -5.0), ("g2", -4.0), ("g1", -5.0)])
    ))?;
    b.write_str(&ranked_table(&[("g1", 1.0), ("g2", 2.0), ("g3", 3.0)]))?;

    Command::cargo_bin(BINARY)?
        .current_dir(temp.path())
        .arg("venn")
        .arg(a.path())
        .arg(b.path())
        .assert()
        .success()
        .stdout("g1\ng2\ng3\n")
        .stderr(predicate::str::contains("not numeric"))
        .stderr(predicate::str::contains("fewer than the window"));

    temp.child("venn_diagram.svg")
        .assert(predicate::str::contains("CR vs AL downregulated"));

    Ok(())
}

#[test]
fn venn_window_rejects_bad_format() -> TestResult {
    Command::cargo_bin(BINARY)?
        .args(["venn", "a.csv", "b.csv", "--window-a", "top:10"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid window format"));

    Ok(())
}
