use anyhow::{Context as AnyhowContext, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use flags::UserTypeFlag;
use kubeauto_cluster::{
    AssumeYes, ClusterManager, Confirmation, KubeautoConfig, Outcome, PromptConfirmation,
    SystemRunner, DEFAULT_EXPIRY,
};
use kubeauto_inventory::Role;
use report::{print_stdout, render_clusters, render_users};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod flags;
mod report;

#[derive(Parser)]
#[command(name = "kubeauto")]
#[command(about = "Kubernetes cluster lifecycle management", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Configuration file (defaults to $KUBEAUTO_CONFIG, then /etc/kubeauto/kubeauto.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Append log records to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Answer yes to every confirmation prompt
    #[arg(short = 'y', long, global = true)]
    yes: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new cluster configuration
    New(ClusterArgs),
    /// Run a setup step (01-07, 10, 11, 90 or its name) against a cluster
    Setup(SetupArgs),
    /// List managed clusters
    List,
    /// Switch the active kubeconfig to a cluster
    Checkout(ClusterArgs),
    /// Create and set up a single-host cluster on this machine
    #[command(name = "start-aio")]
    StartAio,
    /// Start cluster services
    Start(ClusterArgs),
    /// Stop cluster services
    Stop(ClusterArgs),
    /// Upgrade the cluster
    Upgrade(ClusterArgs),
    /// Back up cluster state
    Backup(ClusterArgs),
    /// Restore cluster state from a backup
    Restore(ClusterArgs),
    /// Destroy the cluster
    Destroy(ClusterArgs),
    /// Add an etcd member
    #[command(name = "add-etcd")]
    AddEtcd(AddNodeArgs),
    /// Add a master node
    #[command(name = "add-master")]
    AddMaster(AddNodeArgs),
    /// Add a worker node
    #[command(name = "add-node")]
    AddNode(AddNodeArgs),
    /// Remove an etcd member
    #[command(name = "del-etcd")]
    DelEtcd(NodeArgs),
    /// Remove a master node
    #[command(name = "del-master")]
    DelMaster(NodeArgs),
    /// Remove a worker node
    #[command(name = "del-node")]
    DelNode(NodeArgs),
    /// Recreate the cluster CA and every certificate issued from it
    #[command(name = "kca-renew")]
    KcaRenew(ClusterArgs),
    /// Manage per-user kubeconfigs
    #[command(name = "kcfg-adm")]
    KcfgAdm(KcfgArgs),
}

#[derive(Args)]
struct ClusterArgs {
    /// Cluster name
    cluster: String,
}

#[derive(Args)]
struct SetupArgs {
    /// Cluster name
    cluster: String,

    /// Setup step
    step: String,

    /// Extra arguments passed to the provisioner
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    extra_args: Vec<String>,
}

#[derive(Args)]
struct NodeArgs {
    /// Cluster name
    cluster: String,

    /// Node IP address
    ip: String,
}

#[derive(Args)]
struct AddNodeArgs {
    /// Cluster name
    cluster: String,

    /// Node IP address
    ip: String,

    /// Extra inventory variables for the node, e.g. k8s_nodename='worker-3'
    extra_info: Option<String>,
}

#[derive(Args)]
#[command(group(ArgGroup::new("action").required(true).args(["add", "delete", "list"])))]
struct KcfgArgs {
    /// Cluster name
    cluster: String,

    /// Issue a kubeconfig for a user
    #[arg(short = 'A', long)]
    add: bool,

    /// Revoke a user's bindings and certificates
    #[arg(short = 'D', long, requires = "user")]
    delete: bool,

    /// List users
    #[arg(short = 'L', long)]
    list: bool,

    /// Certificate lifetime
    #[arg(short = 'e', long, default_value = DEFAULT_EXPIRY)]
    expiry: String,

    /// User type
    #[arg(short = 't', long = "type", value_enum, default_value_t = UserTypeFlag::Admin)]
    user_type: UserTypeFlag,

    /// User name (generated when adding without one)
    #[arg(short = 'u', long)]
    user: Option<String>,
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let config =
        KubeautoConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&cli, config.log_file.as_deref())?;
    log::debug!(
        "Base path {}, provisioner {}, arch {}",
        config.base_path.display(),
        config.provisioner,
        config.arch
    );

    let config = Arc::new(config);
    let confirm: Arc<dyn Confirmation> = if cli.yes {
        Arc::new(AssumeYes)
    } else {
        Arc::new(PromptConfirmation::new(config.confirm_timeout))
    };
    let manager = ClusterManager::new(config, Arc::new(SystemRunner), confirm);

    run(cli.command, &manager).await
}

fn init_logging(cli: &Cli, config_log_file: Option<&Path>) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }

    match cli.log_file.as_deref().or(config_log_file) {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        None => {
            builder.target(env_logger::Target::Stderr);
        }
    }
    builder.init();
    Ok(())
}

async fn run(command: Commands, manager: &ClusterManager) -> Result<()> {
    let outcome = match command {
        Commands::New(args) => {
            let dir = manager.registry().new_cluster(&args.cluster).await?;
            print_stdout(&dir.display().to_string())?;
            Outcome::Completed
        }
        Commands::Setup(args) => {
            manager
                .setup(&args.cluster, &args.step, &args.extra_args)
                .await?
        }
        Commands::List => {
            let rows = manager.registry().summaries().await?;
            print_stdout(&render_clusters(&rows))?;
            Outcome::Completed
        }
        Commands::Checkout(args) => {
            manager.registry().checkout(&args.cluster).await?;
            print_stdout(&format!(
                "Set default kubeconfig: cluster {} (current)",
                args.cluster
            ))?;
            Outcome::Completed
        }
        Commands::StartAio => manager.start_aio().await?,
        Commands::Start(args) => manager.operate(&args.cluster, "start").await?,
        Commands::Stop(args) => manager.operate(&args.cluster, "stop").await?,
        Commands::Upgrade(args) => manager.operate(&args.cluster, "upgrade").await?,
        Commands::Backup(args) => manager.operate(&args.cluster, "backup").await?,
        Commands::Restore(args) => manager.operate(&args.cluster, "restore").await?,
        Commands::Destroy(args) => manager.operate(&args.cluster, "destroy").await?,
        Commands::AddEtcd(args) => add(manager, Role::Etcd, args).await?,
        Commands::AddMaster(args) => add(manager, Role::Master, args).await?,
        Commands::AddNode(args) => add(manager, Role::Worker, args).await?,
        Commands::DelEtcd(args) => remove(manager, Role::Etcd, args).await?,
        Commands::DelMaster(args) => remove(manager, Role::Master, args).await?,
        Commands::DelNode(args) => remove(manager, Role::Worker, args).await?,
        Commands::KcaRenew(args) => manager.renew_ca(&args.cluster).await?,
        Commands::KcfgAdm(args) => kcfg_adm(manager, args).await?,
    };
    log::debug!("Finished: {outcome:?}");
    Ok(())
}

async fn add(manager: &ClusterManager, role: Role, args: AddNodeArgs) -> Result<Outcome> {
    manager
        .add_node(&args.cluster, role, &args.ip, args.extra_info.as_deref())
        .await
        .with_context(|| format!("Failed to add {role} node {} to {}", args.ip, args.cluster))
}

async fn remove(manager: &ClusterManager, role: Role, args: NodeArgs) -> Result<Outcome> {
    manager
        .remove_node(&args.cluster, role, &args.ip)
        .await
        .with_context(|| {
            format!(
                "Failed to remove {role} node {} from {}",
                args.ip, args.cluster
            )
        })
}

async fn kcfg_adm(manager: &ClusterManager, args: KcfgArgs) -> Result<Outcome> {
    if args.add {
        let user = manager
            .add_user(
                &args.cluster,
                args.user.as_deref(),
                args.user_type.as_domain(),
                &args.expiry,
            )
            .await?;
        print_stdout(&format!("User {user} added to cluster {}", args.cluster))?;
    } else if args.delete {
        let user = args.user.as_deref().unwrap_or_default();
        manager.delete_user(&args.cluster, user).await?;
    } else {
        let users = manager.list_users(&args.cluster).await?;
        print_stdout(&render_users(&users))?;
    }
    Ok(Outcome::Completed)
}
