//! 单主机时间片共享仿真
//!
//! 若干台相同主机、若干台相同虚拟机、若干个相同作业；所有参数都可通过命令行覆盖。

use clap::{Parser, ValueEnum};
use cloudsim_rs::dc::{
    DatacenterCharacteristics, HostSpec, JobSpec, PlacementKind, UtilizationModel, VmSpec,
};
use cloudsim_rs::setup::run_scenario;
use cloudsim_rs::sim::{
    DatacenterSpec, HostGroupSpec, JobGroupSpec, SCENARIO_SCHEMA_VERSION, ScenarioSpec, UserSpec,
    VmGroupSpec,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Utilization {
    Full,
    Partial,
    Stochastic,
}

#[derive(Debug, Parser)]
#[command(name = "single_host", about = "时间片共享仿真：主机 / 虚拟机 / 作业均同构")]
struct Args {
    #[arg(long, default_value_t = 1)]
    hosts: u32,
    #[arg(long, default_value_t = 1)]
    host_pes: u32,
    #[arg(long, default_value_t = 1000.0)]
    pe_mips: f64,
    /// 主机内存（MB）
    #[arg(long, default_value_t = 2048)]
    host_ram: u64,
    /// 主机带宽（Mbps）
    #[arg(long, default_value_t = 10_000)]
    host_bw: u64,
    /// 主机存储（MB）
    #[arg(long, default_value_t = 1_000_000)]
    host_storage: u64,

    #[arg(long, default_value_t = 1)]
    vms: u32,
    #[arg(long, default_value_t = 1000.0)]
    vm_mips: f64,
    #[arg(long, default_value_t = 1)]
    vm_pes: u32,
    #[arg(long, default_value_t = 512)]
    vm_ram: u64,
    #[arg(long, default_value_t = 1000)]
    vm_bw: u64,
    /// 虚拟机镜像大小（MB）
    #[arg(long, default_value_t = 10_000)]
    vm_size: u64,

    #[arg(long, default_value_t = 3)]
    jobs: u32,
    /// 作业长度（MI）
    #[arg(long, default_value_t = 40_000.0)]
    job_length: f64,
    #[arg(long, default_value_t = 300)]
    job_file_size: u64,
    #[arg(long, default_value_t = 300)]
    job_output_size: u64,

    #[arg(long, value_enum, default_value_t = Utilization::Full)]
    utilization: Utilization,
    /// partial 模型的比例
    #[arg(long, default_value_t = 0.5)]
    fraction: f64,
    /// stochastic 模型的种子
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// 调度间隔（毫秒），0 表示关闭
    #[arg(long, default_value_t = 0)]
    interval_ms: u64,
}

fn main() {
    // 初始化 tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();

    let model = match args.utilization {
        Utilization::Full => UtilizationModel::Full,
        Utilization::Partial => UtilizationModel::Partial {
            fraction: args.fraction,
        },
        Utilization::Stochastic => UtilizationModel::Stochastic { seed: args.seed },
    };

    let spec = ScenarioSpec {
        schema_version: SCENARIO_SCHEMA_VERSION,
        meta: None,
        datacenter: DatacenterSpec {
            characteristics: DatacenterCharacteristics::default(),
            placement: PlacementKind::FirstFit,
            scheduling_interval_ms: Some(args.interval_ms),
            hosts: vec![HostGroupSpec {
                count: args.hosts,
                host: HostSpec::new(
                    args.host_pes,
                    args.pe_mips,
                    args.host_ram,
                    args.host_bw,
                    args.host_storage,
                ),
            }],
        },
        users: vec![UserSpec {
            id: 0,
            vms: vec![VmGroupSpec {
                count: args.vms,
                vm: VmSpec::new(args.vm_mips, args.vm_pes, args.vm_ram, args.vm_bw, args.vm_size),
            }],
            jobs: vec![JobGroupSpec {
                count: args.jobs,
                submit_ms: None,
                job: JobSpec::new(args.job_length)
                    .with_files(args.job_file_size, args.job_output_size)
                    .with_utilization(model),
            }],
        }],
    };

    let report = match run_scenario(&spec) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("simulation failed: {e}");
            std::process::exit(1);
        }
    };

    for r in &report.results {
        println!(
            "job={} status={:?} vm={} host={:?} start={:?} finish={:?} cpu_time={:.3} cost={:.2}",
            r.id.0,
            r.status,
            r.vm_id.0,
            r.host_id.map(|h| h.0),
            r.start_time.map(|t| t.as_secs_f64()),
            r.finish_time.map(|t| t.as_secs_f64()),
            r.actual_cpu_time,
            r.cost,
        );
    }
    println!(
        "done @ {}, succeeded={}, failed={}, cancelled={}",
        report.summary.total_elapsed_time,
        report.summary.succeeded,
        report.summary.failed,
        report.summary.cancelled
    );
}
