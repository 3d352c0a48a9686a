use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*;
use std::process::Command; // Run programs
use tempfile;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

const SAM: &str = "I am Sam. Sam I am. I do not like this Sam I am.\n";

fn write_input(temp_dir: &tempfile::TempDir,name: &str,dat: &[u8]) -> Result<std::path::PathBuf,Box<dyn std::error::Error>> {
    let path = temp_dir.path().join(name);
    std::fs::write(&path,dat)?;
    Ok(path)
}

fn round_trip_test(dat: &[u8]) -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = write_input(&temp_dir,"input.bin",dat)?;
    let cmp_path = temp_dir.path().join("input.huf");
    let out_path = temp_dir.path().join("output.bin");
    Command::cargo_bin("statichuff")?
        .arg("compress")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&cmp_path)
        .assert()
        .success()
        .stderr(predicate::str::contains("compressed"));
    Command::cargo_bin("statichuff")?
        .arg("expand")
        .arg("-i").arg(&cmp_path)
        .arg("-o").arg(&out_path)
        .assert()
        .success()
        .stderr(predicate::str::contains("expanded"));
    assert_eq!(std::fs::read(out_path)?,dat.to_vec());
    Ok(())
}

#[test]
fn compression_matches_library() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = write_input(&temp_dir,"sam.txt",SAM.as_bytes())?;
    let out_path = temp_dir.path().join("sam.huf");
    Command::cargo_bin("statichuff")?
        .arg("compress")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&out_path)
        .assert()
        .success();
    let expected = statichuff::static_huff::encode(SAM.as_bytes())?;
    assert_eq!(std::fs::read(out_path)?,expected);
    Ok(())
}

#[test]
fn concrete_container() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = write_input(&temp_dir,"abc.txt","aabbbcccc".as_bytes())?;
    let out_path = temp_dir.path().join("abc.huf");
    Command::cargo_bin("statichuff")?
        .arg("compress")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&out_path)
        .assert()
        .success()
        .stderr(predicate::str::contains("compressed 9 into 10"));
    assert_eq!(std::fs::read(out_path)?,hex::decode("0361026203630402503C")?);
    Ok(())
}

#[test]
fn round_trips() -> STDRESULT {
    round_trip_test(SAM.as_bytes())?;
    round_trip_test("aaaa".as_bytes())?;
    round_trip_test(&[])?;
    let dense: Vec<u8> = (0..2000).map(|x: u32| (x*x % 251) as u8).collect();
    round_trip_test(&dense)
}

#[test]
fn separate_tree_file() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = write_input(&temp_dir,"sam.txt",SAM.as_bytes())?;
    let tree_path = temp_dir.path().join("sam.ser");
    let dat_path = temp_dir.path().join("sam.dat");
    let out_path = temp_dir.path().join("sam_de.txt");
    Command::cargo_bin("statichuff")?
        .arg("compress")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&dat_path)
        .arg("-t").arg(&tree_path)
        .assert()
        .success();
    let joined = [std::fs::read(&tree_path)?,std::fs::read(&dat_path)?].concat();
    assert_eq!(joined,statichuff::static_huff::encode(SAM.as_bytes())?);
    Command::cargo_bin("statichuff")?
        .arg("expand")
        .arg("-i").arg(&dat_path)
        .arg("-o").arg(&out_path)
        .arg("-t").arg(&tree_path)
        .assert()
        .success();
    assert_eq!(std::fs::read(out_path)?,SAM.as_bytes().to_vec());
    Ok(())
}

#[test]
fn truncated_container_fails() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = write_input(&temp_dir,"bad.huf",&hex::decode("03610262")?)?;
    let out_path = temp_dir.path().join("bad.txt");
    Command::cargo_bin("statichuff")?
        .arg("expand")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&out_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("TruncatedTree"));
    Ok(())
}
