extern crate clap;
use fpalloc::mm::Allocator;
use fpalloc::mm::AllocError;
use fpalloc::mm::ArenaChainConfig;
use fpalloc::mm::ArenaWithFallback;
use fpalloc::mm::PageAllocator;
use fpalloc::num::Pow2Usize;

#[derive(Debug)]
struct Invocation {
    verbose: bool,
    node_size: usize,
    rounds: usize,
    items: Vec<String>,
}

struct ToolError {
    exit_code: u8,
    msg: String
}

impl From<AllocError> for ToolError {
    fn from(e: AllocError) -> Self {
        ToolError { exit_code: 3, msg: format!("allocation failed: {}", e) }
    }
}

struct LoadStatus {
    lines: usize,
    arena_bytes: usize,
    big_lines: usize,
    big_bytes: usize,
}

impl LoadStatus {
    pub fn new() -> Self {
        LoadStatus { lines: 0, arena_bytes: 0, big_lines: 0, big_bytes: 0 }
    }
}

/* process_args *************************************************************/
fn process_args(args: Vec<String>) -> Result<Invocation, ToolError> {
    let m = clap::App::new("arena_demo")
        .version("0.0")
        .about("loads text files line by line into an arena-with-fallback allocator")
        .arg(clap::Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("prints what it does verbosely"))
        .arg(clap::Arg::with_name("node-size")
                .short("n")
                .long("node-size")
                .help("bytes per arena node")
                .takes_value(true)
                .default_value("16384"))
        .arg(clap::Arg::with_name("rounds")
                .short("r")
                .long("rounds")
                .help("how many times to load every item (arena is reset in between)")
                .takes_value(true)
                .default_value("1"))
        .arg(clap::Arg::with_name("items")
                .help("text file(s) to load")
                .multiple(true))
        .get_matches_from(args);

    let parse = |name: &str| -> Result<usize, ToolError> {
        m.value_of(name).unwrap_or("0").parse::<usize>().map_err(|e| ToolError {
            exit_code: 1,
            msg: format!("bad value for --{}: {}", name, e),
        })
    };

    let inv = Invocation {
        verbose: m.is_present("verbose"),
        node_size: parse("node-size")?,
        rounds: parse("rounds")?,
        items:
            if let Some(values) = m.values_of("items") {
                values.map(String::from).collect()
            } else {
                Vec::new()
            },
    };

    if inv.verbose {
        eprintln!("inv: {:#?}", inv);
    }

    Ok(inv)
}

fn load_item(
    text: &str,
    arena: &ArenaWithFallback<'_>,
    status: &mut LoadStatus,
) -> Result<(), AllocError> {
    let usable = arena.chain().usable_node_size();
    for line in text.lines() {
        let size = line.len();
        let p = arena.alloc(size, Pow2Usize::one())?;
        unsafe {
            core::ptr::copy_nonoverlapping(line.as_ptr(), p.as_ptr(), size);
        }
        status.lines += 1;
        if size > usable {
            status.big_lines += 1;
            status.big_bytes += size;
            // big lines are not reclaimed by reset
            unsafe { arena.free(p, size, Pow2Usize::one()) };
        } else {
            status.arena_bytes += size;
        }
    }
    Ok(())
}

/* run **********************************************************************/
fn run(invocation: &Invocation) -> Result<(), ToolError> {
    let pages = PageAllocator::new();
    let mut arena = ArenaWithFallback::with_config(
        pages.to_ref(),
        ArenaChainConfig::with_node_size(invocation.node_size))?;
    arena.chain().reserve_nodes(64)?;

    let mut texts = Vec::new();
    for item in &invocation.items {
        match std::fs::read_to_string(item) {
            Ok(t) => texts.push(t),
            Err(e) => return Err(ToolError {
                exit_code: 2,
                msg: format!("error reading {:?}: {}", item, e),
            }),
        }
    }

    for round in 0..invocation.rounds {
        let mut status = LoadStatus::new();
        for text in &texts {
            load_item(text, &arena, &mut status)?;
        }
        println!("round {}: {} lines, {} bytes in {} node(s), {} big line(s) with {} bytes",
            round, status.lines, status.arena_bytes, arena.chain().node_count(),
            status.big_lines, status.big_bytes);
        if invocation.verbose {
            eprintln!("{:?}", arena);
        }
        arena.reset();
    }
    Ok(())
}

/* main *********************************************************************/
fn main() {
    env_logger::init();
    process_args(std::env::args().collect())
    .and_then(|invocation| run(&invocation))
    .unwrap_or_else(|e| {
        eprintln!("{}", e.msg);
        std::process::exit(e.exit_code as i32);
    });
}
