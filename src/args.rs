use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "social-relay")]
#[command(about = "Sign social actions, submit them on chain and wait until they are indexed")]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// GraphQL relay URL override
    #[arg(long)]
    pub graphql_url: Option<String>,

    /// JSON-RPC URL override
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// Hex private key override
    #[arg(long)]
    pub private_key: Option<String>,

    /// Print Prometheus metrics after the command finishes
    #[arg(long)]
    pub print_metrics: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Follow a profile
    Follow { profile_id: String },

    /// Unfollow a profile by burning its follow NFT
    Unfollow { profile_id: String },

    /// Publish a post whose content is already uploaded
    Post {
        profile_id: String,
        content_uri: String,

        /// Collect module as JSON, e.g. '{"freeCollectModule":{"followerOnly":false}}'
        #[arg(long, default_value = r#"{"revertCollectModule":true}"#)]
        collect_module: String,

        /// Only followers may comment or mirror
        #[arg(long)]
        follower_only_reference: bool,
    },

    /// Collect a publication
    Collect { publication_id: String },

    /// Create a profile through the relay
    CreateProfile {
        handle: String,

        #[arg(long)]
        profile_picture_uri: Option<String>,

        #[arg(long)]
        follow_nft_uri: Option<String>,
    },

    /// Check whether an address follows the given profiles
    DoesFollow {
        /// Follower address (defaults to the configured wallet)
        #[arg(long)]
        follower: Option<String>,

        #[arg(required = true)]
        profile_ids: Vec<String>,
    },

    /// Look up profiles by exactly one selector
    Profiles {
        #[arg(long = "id", group = "selector")]
        ids: Vec<String>,

        #[arg(long = "handle", group = "selector")]
        handles: Vec<String>,

        #[arg(long = "owned-by", group = "selector")]
        owned_by: Vec<String>,

        #[arg(long = "mirrored", group = "selector")]
        who_mirrored: Option<String>,

        #[arg(long)]
        limit: Option<u32>,

        #[arg(long)]
        cursor: Option<String>,
    },

    /// List currencies enabled for fee collect modules
    Currencies,
}
