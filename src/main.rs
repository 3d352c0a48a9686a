use clap::{arg,crate_version,Command};
use statichuff::{static_huff,STD_OPTIONS};
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

const RCH: &str = "unreachable was reached";

fn ok_to_overwrite(path_out: &str) -> bool {
    if let Ok(_f) = std::fs::File::open(path_out) {
        let mut ans = String::new();
        eprint!("{} exists, overwrite? (y/n) ",path_out);
        std::io::stdin().read_line(&mut ans).expect("could not read stdin");
        if ans.trim_end()=="y" || ans.trim_end()=="Y" {
            return true;
        }
        return false;
    }
    true
}

fn ratio(expanded: u64,compressed: u64) -> f64 {
    match compressed {
        0 => 1.0,
        c => expanded as f64 / c as f64
    }
}

fn main() -> STDRESULT
{
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let long_help =
"Examples:
---------
Compress:      `statichuff compress -i my_expanded -o my_compressed`
Expand:        `statichuff expand -i my_compressed -o my_expanded`
Separate tree: `statichuff compress -i my_expanded -o my_payload -t my_tree`";

    let mut main_cmd = Command::new("statichuff")
        .about("Compress and expand with a static Huffman code")
        .after_long_help(long_help)
        .version(crate_version!());
    main_cmd = main_cmd.subcommand(Command::new("compress")
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(-o --output <PATH> "output path").required(true))
        .arg(arg!(-t --tree <PATH> "write the tree section to a separate file").required(false))
        .about("compress a file"));

    main_cmd = main_cmd.subcommand(Command::new("expand")
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(-o --output <PATH> "output path").required(true))
        .arg(arg!(-t --tree <PATH> "read the tree section from a separate file").required(false))
        .about("expand a file"));

    let matches = main_cmd.get_matches();

    if let Some(cmd) = matches.subcommand_matches("compress") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let path_out = cmd.get_one::<String>("output").expect(RCH);
        if !ok_to_overwrite(path_out) {
            eprintln!("abort operation");
            return Ok(());
        }
        let mut in_file = std::fs::File::open(path_in)?;
        let (in_size,out_size) = match cmd.get_one::<String>("tree") {
            Some(path_tree) => {
                if !ok_to_overwrite(path_tree) {
                    eprintln!("abort operation");
                    return Ok(());
                }
                let mut tree_file = std::fs::File::create(path_tree)?;
                let mut out_file = std::fs::File::create(path_out)?;
                static_huff::compress_split(&mut in_file,&mut tree_file,&mut out_file)?
            },
            None => {
                let mut out_file = std::fs::OpenOptions::new().write(true).truncate(false).create(true).open(path_out)?;
                let (in_size,out_size) = static_huff::compress(&mut in_file,&mut out_file,&STD_OPTIONS)?;
                out_file.set_len(out_size)?;
                (in_size,out_size)
            }
        };
        eprintln!("compressed {} into {}, ratio {:.3}",in_size,out_size,ratio(in_size,out_size));
    }

    if let Some(cmd) = matches.subcommand_matches("expand") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let path_out = cmd.get_one::<String>("output").expect(RCH);
        if !ok_to_overwrite(path_out) {
            eprintln!("abort operation");
            return Ok(());
        }
        let mut in_file = std::fs::File::open(path_in)?;
        let (in_size,out_size) = match cmd.get_one::<String>("tree") {
            Some(path_tree) => {
                let mut tree_file = std::fs::File::open(path_tree)?;
                let mut out_file = std::fs::File::create(path_out)?;
                static_huff::expand_split(&mut tree_file,&mut in_file,&mut out_file)?
            },
            None => {
                let mut out_file = std::fs::OpenOptions::new().write(true).truncate(false).create(true).open(path_out)?;
                let (in_size,out_size) = static_huff::expand(&mut in_file,&mut out_file,&STD_OPTIONS)?;
                out_file.set_len(out_size)?;
                (in_size,out_size)
            }
        };
        eprintln!("expanded {} into {}, ratio {:.3}",in_size,out_size,ratio(out_size,in_size));
    }

    Ok(())
}
