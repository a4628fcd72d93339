use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;

use chrono::NaiveDate;
use getopts::{Matches, Options};
use syllabus_parser::CourseInfo;
use tokio::time::Duration;

pub struct Args {
    pub address: SocketAddr,
    pub enable_cache: bool,
    pub cache_ttl: Duration,
    pub timezone: String,
    pub year: Option<i32>,
    pub semester_start: Option<NaiveDate>,
    pub course: CourseInfo,
    /// Set when a file should be converted instead of serving.
    pub convert: Option<Convert>,
}

pub struct Convert {
    pub input: PathBuf,
    pub output: PathBuf,
}

fn opts() -> Options {
    let mut opts = Options::new();
    opts.optflag(
        "h",
        "help",
        concat!("Print the help output of ", env!("CARGO_PKG_NAME")),
    );
    opts.optopt(
        "a",
        "address",
        "Socket address (IP and port) to listen on [Default: 127.0.0.1:8080]",
        "SOCKET_ADDRESS",
    );
    opts.optflag(
        "c",
        "enable-cache",
        "Enable caching of fetched syllabi [Default: false]",
    );
    opts.optopt(
        "t",
        "cache-ttl",
        "Time-to-live for cached syllabi [Default: 3600]",
        "SECONDS",
    );
    opts.optopt(
        "z",
        "timezone",
        "IANA timezone for generated events [Default: UTC]",
        "TIMEZONE",
    );
    opts.optopt(
        "y",
        "year",
        "Year for dates that omit one [Default: current year]",
        "YEAR",
    );
    opts.optopt(
        "s",
        "semester-start",
        "Monday of week 1 [Default: first Monday of the year]",
        "YYYY-MM-DD",
    );
    opts.optopt(
        "i",
        "input",
        "Convert this syllabus file instead of starting the server",
        "FILE",
    );
    opts.optopt(
        "o",
        "output",
        "Where to write the converted calendar [Default: input with .ics extension]",
        "FILE",
    );
    opts.optopt("", "title", "Course title used in event summaries", "TITLE");
    opts.optopt("", "instructor", "Instructor listed in event descriptions", "NAME");
    opts
}

fn exit_invalid(option: &str, err: impl Display) -> ! {
    eprintln!("Provided value for option '{option}' is invalid: {err}");
    process::exit(1);
}

fn opt_or_exit<T>(matches: &Matches, option: &str) -> Option<T>
where
    T: std::str::FromStr,
    T::Err: Display,
{
    matches
        .opt_get(option)
        .unwrap_or_else(|err| exit_invalid(option, err))
}

pub fn parse(args: Vec<String>) -> Args {
    let opts = opts();

    let matches = match opts.parse(args) {
        Ok(matches) => matches,
        Err(fail) => {
            eprintln!("{fail}");
            process::exit(1);
        }
    };

    if matches.opt_present("help") {
        println!("{}", opts.usage(&opts.short_usage(env!("CARGO_PKG_NAME"))));
        process::exit(0);
    }

    let address = match matches.opt_get_default("address", SocketAddr::from(([127, 0, 0, 1], 8080)))
    {
        Ok(address) => address,
        Err(err) => exit_invalid("address", err),
    };

    let enable_cache = matches.opt_present("enable-cache");

    let cache_ttl = match matches.opt_get_default("cache-ttl", 3600) {
        Ok(secs) => Duration::from_secs(secs),
        Err(err) => exit_invalid("cache-ttl", err),
    };

    let timezone = matches.opt_str("timezone").unwrap_or_else(|| "UTC".to_string());
    if let Err(err) = syllabus_parser::parse_timezone(&timezone) {
        exit_invalid("timezone", err);
    }

    let convert = matches.opt_str("input").map(PathBuf::from).map(|input| Convert {
        output: matches
            .opt_str("output")
            .map_or_else(|| input.with_extension("ics"), PathBuf::from),
        input,
    });

    if convert.is_none() && matches.opt_present("output") {
        eprintln!("Option 'output' requires 'input'");
        process::exit(1);
    }

    Args {
        address,
        enable_cache,
        cache_ttl,
        timezone,
        year: opt_or_exit(&matches, "year"),
        semester_start: opt_or_exit(&matches, "semester-start"),
        course: CourseInfo {
            title: matches.opt_str("title"),
            instructor: matches.opt_str("instructor"),
        },
        convert,
    }
}
