//! Baton - Supervisor / Planner / Executor 编排循环
//!
//! 入口：初始化日志与配置，读取目标，运行（或恢复）一次编排，流式打印回合进度，最后输出计划、执行日志与原始最终状态。

use std::fmt::Write as _;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use baton::config::{load_config, AppConfig};
use baton::core::{AgentState, OrchestratorEvent};
use baton::llm::LlmClient;
use baton::runtime::{build_orchestrator_with_llm, create_llm_from_config};
use clap::Parser;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(name = "baton", version, about = "Planner / Executor multi-agent workflow")]
struct Cli {
    /// 目标；省略时从标准输入读取
    goal: Vec<String>,

    /// 额外的 TOML 配置文件
    #[arg(long)]
    config: Option<PathBuf>,

    /// 检查点使用的 run id（覆盖 [app].run_id）
    #[arg(long)]
    run_id: Option<String>,

    /// 从 run id 的最近检查点继续
    #[arg(long)]
    resume: bool,

    /// 以 JSON 输出最终状态（stdout 只有 JSON）
    #[arg(long)]
    json: bool,
}

fn read_goal(cli: &Cli) -> anyhow::Result<String> {
    if !cli.goal.is_empty() {
        return Ok(cli.goal.join(" "));
    }
    eprint!("Goal: ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read goal from stdin")?;
    Ok(line.trim().to_string())
}

fn print_event(event: &OrchestratorEvent) {
    match event {
        OrchestratorEvent::PlanReady { .. } => {
            println!("\n[Planner Output] Planned steps updated.");
        }
        OrchestratorEvent::StepExecuted { index, .. } => {
            println!("\n[Executor Output] Completed step index {}.", index);
        }
        _ => {}
    }
}

fn format_summary(state: &AgentState, (prompt, completion, total): (u64, u64, u64)) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "\n--- Final Plan ---");
    for (i, step) in state.plan.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", i + 1, step);
    }

    let _ = writeln!(out, "\n--- Execution Log ---");
    for entry in &state.execution_log {
        let _ = writeln!(out, "{}", "-".repeat(40));
        let _ = writeln!(out, "{}", entry);
    }

    let _ = writeln!(out, "\n--- Final State (raw) ---");
    let _ = writeln!(out, "{:#?}", state);

    if total > 0 {
        let _ = writeln!(
            out,
            "\nTokens: {} prompt + {} completion = {} total",
            prompt, completion, total
        );
    }
    out
}

/// 最终输出：--json 时只有状态 JSON，否则为可读摘要
fn render_output(
    state: &AgentState,
    usage: (u64, u64, u64),
    json: bool,
) -> anyhow::Result<String> {
    if json {
        Ok(serde_json::to_string_pretty(state)?)
    } else {
        Ok(format_summary(state, usage))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    baton::observability::init();

    let cli = Cli::parse();

    let cfg = load_config(cli.config.clone()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    let llm = create_llm_from_config(&cfg);
    let mut orchestrator = build_orchestrator_with_llm(&cfg, llm.clone())
        .await
        .context("Failed to build orchestrator")?;

    // --json 时不打印进度，保证 stdout 只有最终 JSON
    let printer = if cli.json {
        None
    } else {
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        orchestrator = orchestrator.with_event_tx(event_tx);
        Some(tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                print_event(&event);
            }
        }))
    };

    let run_id = cli.run_id.clone().or_else(|| cfg.app.run_id.clone());

    let result = if cli.resume {
        let run_id = run_id.context("--resume requires a run id")?;
        orchestrator.resume(&run_id).await
    } else {
        if !cli.json {
            println!("--- Planner/Executor Multi-Agent Workflow ---");
        }
        let goal = read_goal(&cli)?;
        match run_id {
            Some(id) => orchestrator.run_with_id(&id, &goal).await,
            None => orchestrator.run(&goal).await,
        }
    };

    // 关闭事件通道，等待进度打印结束
    drop(orchestrator);
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    let state = result.context("Run failed")?;
    let usage = llm.token_usage();

    if cli.json {
        tracing::info!(
            prompt_tokens = usage.0,
            completion_tokens = usage.1,
            total_tokens = usage.2,
            "token usage"
        );
    }
    println!("{}", render_output(&state, usage, cli.json)?);

    Ok(())
}
