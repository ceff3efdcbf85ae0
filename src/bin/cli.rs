//! zsetkv CLI
//!
//! Runs one sorted-set command against a local data directory.

use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use zsetkv::{
    AddFlags, Config, Engine, LexRange, MemberScore, Result, ScoreRange, WalSyncStrategy, ZSet,
    ZsetError,
};

/// zsetkv CLI
#[derive(Parser, Debug)]
#[command(name = "zsetkv-cli")]
#[command(about = "Sorted sets on a local zsetkv data directory")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./zsetkv_data")]
    data_dir: String,

    /// MemTable size limit in MB before flush
    #[arg(short = 'm', long, default_value = "64")]
    memtable_mb: usize,

    #[command(subcommand)]
    command: Commands,
}

/// `--withscores` / `--limit OFFSET COUNT` shared by the range commands
#[derive(ClapArgs, Debug)]
struct RangeOpts {
    /// Walk from the high end
    #[arg(long)]
    rev: bool,

    /// Print scores next to members
    #[arg(long)]
    withscores: bool,

    /// Skip OFFSET matches, then return at most COUNT (negative = all)
    #[arg(long, num_args = 2, value_names = ["OFFSET", "COUNT"], allow_hyphen_values = true)]
    limit: Option<Vec<i64>>,
}

impl RangeOpts {
    fn window(&self) -> Result<(usize, i64)> {
        match self.limit.as_deref() {
            None => Ok((0, -1)),
            Some([offset, count]) => {
                let offset = usize::try_from(*offset)
                    .map_err(|_| ZsetError::InvalidArgument("offset must be >= 0".into()))?;
                Ok((offset, *count))
            }
            Some(_) => Err(ZsetError::InvalidArgument(
                "--limit takes OFFSET and COUNT".into(),
            )),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add members: SCORE MEMBER [SCORE MEMBER ...]
    Add {
        key: String,
        #[arg(long)]
        nx: bool,
        #[arg(long)]
        xx: bool,
        #[arg(long)]
        gt: bool,
        #[arg(long)]
        lt: bool,
        #[arg(long)]
        ch: bool,
        #[arg(required = true, allow_hyphen_values = true)]
        pairs: Vec<String>,
    },

    /// Increment a member's score
    #[command(name = "incrby")]
    IncrBy {
        key: String,
        #[arg(allow_hyphen_values = true)]
        increment: f64,
        member: String,
    },

    /// Remove members
    #[command(name = "rem")]
    Rem {
        key: String,
        #[arg(required = true)]
        members: Vec<String>,
    },

    /// Score of one member
    Score { key: String, member: String },

    /// Scores of several members
    #[command(name = "mscore")]
    MScore {
        key: String,
        #[arg(required = true)]
        members: Vec<String>,
    },

    /// Rank of a member
    Rank {
        key: String,
        member: String,
        #[arg(long)]
        rev: bool,
    },

    /// Members between two ranks (inclusive, negative counts from the end)
    Range {
        key: String,
        #[arg(allow_hyphen_values = true)]
        start: i64,
        #[arg(allow_hyphen_values = true)]
        stop: i64,
        #[arg(long)]
        rev: bool,
        #[arg(long)]
        withscores: bool,
    },

    /// Members with MIN <= score <= MAX (`(` excludes, `-inf`/`+inf` allowed)
    #[command(name = "rangebyscore")]
    RangeByScore {
        key: String,
        #[arg(allow_hyphen_values = true)]
        min: String,
        #[arg(allow_hyphen_values = true)]
        max: String,
        #[command(flatten)]
        opts: RangeOpts,
    },

    /// Members between MIN and MAX in byte order (`[x`, `(x`, `-`, `+`)
    #[command(name = "rangebylex")]
    RangeByLex {
        key: String,
        #[arg(allow_hyphen_values = true)]
        min: String,
        #[arg(allow_hyphen_values = true)]
        max: String,
        #[command(flatten)]
        opts: RangeOpts,
    },

    /// Number of members in a score range
    Count {
        key: String,
        #[arg(allow_hyphen_values = true)]
        min: String,
        #[arg(allow_hyphen_values = true)]
        max: String,
    },

    /// Number of members in a lexicographic range
    #[command(name = "lexcount")]
    LexCount {
        key: String,
        #[arg(allow_hyphen_values = true)]
        min: String,
        #[arg(allow_hyphen_values = true)]
        max: String,
    },

    /// Number of members
    Card { key: String },

    /// Remove members in a score range
    #[command(name = "remrangebyscore")]
    RemRangeByScore {
        key: String,
        #[arg(allow_hyphen_values = true)]
        min: String,
        #[arg(allow_hyphen_values = true)]
        max: String,
    },

    /// Remove members between two ranks
    #[command(name = "remrangebyrank")]
    RemRangeByRank {
        key: String,
        #[arg(allow_hyphen_values = true)]
        start: i64,
        #[arg(allow_hyphen_values = true)]
        stop: i64,
    },

    /// Remove members in a lexicographic range
    #[command(name = "remrangebylex")]
    RemRangeByLex {
        key: String,
        #[arg(allow_hyphen_values = true)]
        min: String,
        #[arg(allow_hyphen_values = true)]
        max: String,
    },

    /// Pop the lowest-scored members
    #[command(name = "popmin")]
    PopMin {
        key: String,
        #[arg(default_value_t = 1)]
        count: i64,
    },

    /// Pop the highest-scored members
    #[command(name = "popmax")]
    PopMax {
        key: String,
        #[arg(default_value_t = 1)]
        count: i64,
    },

    /// Delete a whole collection
    Del { key: String },

    /// Reclaim keys left behind by deleted or overwritten collections
    Purge { key: String },

    /// Flush and merge all SSTables
    Compact,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,zsetkv=debug"));

    // Replies go to stdout, logs to stderr
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("command failed: {}", e);
        eprintln!("(error) {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .wal_sync_strategy(WalSyncStrategy::EveryWrite)
        .memtable_size_limit(args.memtable_mb * 1024 * 1024)
        .build();

    let zset = ZSet::open(Engine::open(config)?)?;

    execute(&zset, args.command)?;

    zset.into_store().close()
}

fn execute(zset: &ZSet<Engine>, command: Commands) -> Result<()> {
    match command {
        Commands::Add {
            key,
            nx,
            xx,
            gt,
            lt,
            ch,
            pairs,
        } => {
            let flags = AddFlags { nx, xx, gt, lt, ch };
            let members = parse_pairs(&pairs)?;
            println!("(integer) {}", zset.add(key.as_bytes(), flags, &members)?);
        }
        Commands::IncrBy {
            key,
            increment,
            member,
        } => {
            let score = zset.incr_by(key.as_bytes(), member.as_bytes(), increment)?;
            println!("{}", score);
        }
        Commands::Rem { key, members } => {
            println!("(integer) {}", zset.remove(key.as_bytes(), &to_bytes(members))?);
        }
        Commands::Score { key, member } => match zset.score(key.as_bytes(), member.as_bytes()) {
            Ok(score) => println!("{}", score),
            Err(ZsetError::NotFound) => println!("(nil)"),
            Err(e) => return Err(e),
        },
        Commands::MScore { key, members } => {
            for score in zset.mscore(key.as_bytes(), &to_bytes(members))? {
                match score {
                    Some(score) => println!("{}", score),
                    None => println!("(nil)"),
                }
            }
        }
        Commands::Rank { key, member, rev } => {
            match zset.rank(key.as_bytes(), member.as_bytes(), rev)? {
                -1 => println!("(nil)"),
                rank => println!("(integer) {}", rank),
            }
        }
        Commands::Range {
            key,
            start,
            stop,
            rev,
            withscores,
        } => {
            let entries = zset.range_by_rank(key.as_bytes(), start, stop, rev)?;
            print_entries(&entries, withscores);
        }
        Commands::RangeByScore { key, min, max, opts } => {
            let (offset, count) = opts.window()?;
            let mut range = ScoreRange::parse(&min, &max)?.with_limit(offset, count);
            range.reversed = opts.rev;
            let entries = zset.range_by_score(key.as_bytes(), &range)?;
            print_entries(&entries, opts.withscores);
        }
        Commands::RangeByLex { key, min, max, opts } => {
            let (offset, count) = opts.window()?;
            let mut range =
                LexRange::parse(min.as_bytes(), max.as_bytes())?.with_limit(offset, count);
            range.reversed = opts.rev;
            let members = zset.range_by_lex(key.as_bytes(), &range)?;
            if members.is_empty() {
                println!("(empty)");
            }
            for (i, member) in members.iter().enumerate() {
                println!("{}) {}", i + 1, String::from_utf8_lossy(member));
            }
        }
        Commands::Count { key, min, max } => {
            let range = ScoreRange::parse(&min, &max)?;
            println!("(integer) {}", zset.count(key.as_bytes(), &range)?);
        }
        Commands::LexCount { key, min, max } => {
            let range = LexRange::parse(min.as_bytes(), max.as_bytes())?;
            println!("(integer) {}", zset.lex_count(key.as_bytes(), &range)?);
        }
        Commands::Card { key } => {
            println!("(integer) {}", zset.card(key.as_bytes())?);
        }
        Commands::RemRangeByScore { key, min, max } => {
            let range = ScoreRange::parse(&min, &max)?;
            println!(
                "(integer) {}",
                zset.remove_range_by_score(key.as_bytes(), &range)?
            );
        }
        Commands::RemRangeByRank { key, start, stop } => {
            println!(
                "(integer) {}",
                zset.remove_range_by_rank(key.as_bytes(), start, stop)?
            );
        }
        Commands::RemRangeByLex { key, min, max } => {
            let range = LexRange::parse(min.as_bytes(), max.as_bytes())?;
            println!(
                "(integer) {}",
                zset.remove_range_by_lex(key.as_bytes(), &range)?
            );
        }
        Commands::PopMin { key, count } => {
            print_entries(&zset.pop(key.as_bytes(), count, true)?, true);
        }
        Commands::PopMax { key, count } => {
            print_entries(&zset.pop(key.as_bytes(), count, false)?, true);
        }
        Commands::Del { key } => {
            let existed = zset.delete(key.as_bytes())?;
            println!("(integer) {}", u8::from(existed));
        }
        Commands::Purge { key } => {
            println!("(integer) {}", zset.purge_stale(key.as_bytes())?);
        }
        Commands::Compact => {
            let live = zset.store().compact()?;
            println!("compacted into {} live entries", live);
        }
    }
    Ok(())
}

/// `SCORE MEMBER [SCORE MEMBER ...]`
fn parse_pairs(pairs: &[String]) -> Result<Vec<MemberScore>> {
    if pairs.len() % 2 != 0 {
        return Err(ZsetError::InvalidArgument(
            "expected SCORE MEMBER pairs".into(),
        ));
    }
    pairs
        .chunks(2)
        .map(|pair| {
            let score: f64 = pair[0].parse().map_err(|_| {
                ZsetError::InvalidArgument(format!("score is not a float: {}", pair[0]))
            })?;
            Ok(MemberScore::new(pair[1].as_bytes(), score))
        })
        .collect()
}

fn to_bytes(members: Vec<String>) -> Vec<Vec<u8>> {
    members.into_iter().map(String::into_bytes).collect()
}

fn print_entries(entries: &[MemberScore], withscores: bool) {
    if entries.is_empty() {
        println!("(empty)");
        return;
    }
    let mut line = 1;
    for entry in entries {
        println!("{}) {}", line, String::from_utf8_lossy(&entry.member));
        line += 1;
        if withscores {
            println!("{}) {}", line, entry.score);
            line += 1;
        }
    }
}
