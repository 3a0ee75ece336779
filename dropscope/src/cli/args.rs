//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

use crate::symbolization::KALLSYMS_PATH;

#[derive(Parser, Debug)]
#[command(
    name = "dropscope",
    about = "Print the kernel stack of every dropped packet",
    after_help = "\
EXAMPLES:
    sudo dropscope                           Report drops in every namespace
    sudo dropscope --netns 4026532281        Only drops in one namespace
    sudo dropscope --duration 30             Stop after 30 seconds

Find a namespace id with: readlink /proc/<pid>/ns/net"
)]
pub struct Args {
    /// Network namespace inode to watch (0 = all namespaces)
    #[arg(short, long, default_value = "0", value_name = "ID")]
    pub netns: u64,

    /// Kernel symbol listing used for resolution
    #[arg(long, default_value = KALLSYMS_PATH, value_name = "PATH")]
    pub kallsyms: PathBuf,

    /// Stop after N seconds (0 = unlimited)
    #[arg(long, default_value = "0")]
    pub duration: u64,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Namespace filter, `None` when every namespace is reported
    #[must_use]
    pub fn netns_filter(&self) -> Option<u64> {
        (self.netns != 0).then_some(self.netns)
    }
}
