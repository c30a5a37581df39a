//! REPL 模式（交互式控制面板）
//!
//! - 专用输入线程（rustyline，保留历史记录），每条命令执行完后才显示下一个提示符
//! - 专用打印线程，实时输出会话通知
//! - Ctrl+C 发送 `PARAR`

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, bounded, select};
use motor_driver::{ChannelSink, MotorBuilder, MotorController, suggested_theoretical};
use motor_protocol::{Direction, validate_frequency};
use rustyline::Editor;
use std::sync::Arc;
use std::thread;

use crate::commands::config::CliConfig;
use crate::utils;

/// 校准子命令
#[derive(Debug, Clone, PartialEq)]
pub enum CalCommand {
    Start,
    /// 移动到理论角度（缺省时使用建议值 90/180/270）
    Move(Option<f64>),
    Record(f64),
    Submit,
    Disable,
    Reset,
}

/// REPL 命令
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Connect(Option<String>),
    Disconnect,
    Power,
    Stop,
    Direction(Direction),
    Move {
        degrees: f64,
        frequency: Option<u32>,
    },
    Frequency(u32),
    Home,
    Cal(CalCommand),
    Status,
    Help,
    Exit,
}

fn parse_number<T: std::str::FromStr>(text: Option<&&str>, what: &str) -> Result<T> {
    let text = text.ok_or_else(|| anyhow::anyhow!("缺少参数: {what}"))?;
    text.parse::<T>()
        .map_err(|_| anyhow::anyhow!("无效的{what}: {text}"))
}

/// 解析一行输入
pub fn parse_command(line: &str) -> Result<ReplCommand> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some(&head) = parts.first() else {
        anyhow::bail!("空命令");
    };

    let command = match head {
        "connect" => ReplCommand::Connect(parts.get(1).map(|s| s.to_string())),
        "disconnect" => ReplCommand::Disconnect,
        "power" => ReplCommand::Power,
        "stop" => ReplCommand::Stop,
        "dir" => match parts.get(1).copied() {
            Some("fwd") | Some("forward") => ReplCommand::Direction(Direction::Forward),
            Some("rev") | Some("reverse") => ReplCommand::Direction(Direction::Reverse),
            _ => anyhow::bail!("用法: dir fwd|rev"),
        },
        "move" => ReplCommand::Move {
            degrees: parse_number(parts.get(1), "角度")?,
            frequency: match parts.get(2) {
                Some(_) => Some(parse_number(parts.get(2), "频率")?),
                None => None,
            },
        },
        "freq" => ReplCommand::Frequency(parse_number(parts.get(1), "频率")?),
        "home" => ReplCommand::Home,
        "cal" => ReplCommand::Cal(match parts.get(1).copied() {
            Some("start") => CalCommand::Start,
            Some("move") => CalCommand::Move(match parts.get(2) {
                Some(_) => Some(parse_number(parts.get(2), "理论角度")?),
                None => None,
            }),
            Some("record") => CalCommand::Record(parse_number(parts.get(2), "实测角度")?),
            Some("submit") => CalCommand::Submit,
            Some("disable") => CalCommand::Disable,
            Some("reset") => CalCommand::Reset,
            _ => anyhow::bail!("用法: cal start|move [deg]|record <deg>|submit|disable|reset"),
        }),
        "status" => ReplCommand::Status,
        "help" => ReplCommand::Help,
        "exit" | "quit" => ReplCommand::Exit,
        other => anyhow::bail!("未知命令: {other}"),
    };
    Ok(command)
}

/// REPL 会话（保持控制器连接）
pub struct ReplSession {
    controller: Option<MotorController>,
    config: CliConfig,
    frequency_hz: u32,
}

impl ReplSession {
    pub fn new(config: CliConfig) -> Self {
        let frequency_hz = config.frequency_hz();
        Self {
            controller: None,
            config,
            frequency_hz,
        }
    }

    fn controller(&self) -> Result<&MotorController> {
        self.controller
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("未连接，请先使用 connect 命令"))
    }

    /// 连接到控制器
    pub fn connect(&mut self, port: Option<&str>) -> Result<()> {
        if self.controller.as_ref().is_some_and(|c| c.is_connected()) {
            println!("⚠️  已经连接");
            return Ok(());
        }
        // 链路丢失后残留的控制器
        self.controller = None;

        let port = utils::choose_port(port, &self.config)?;
        println!("⏳ 连接到 {port}...");

        let (sink, notifications) = ChannelSink::new();
        let controller = MotorBuilder::new()
            .port(port.as_str())
            .baud_rate(self.config.baud_rate())
            .poll_interval_ms(self.config.poll_interval_ms())
            .sink(Arc::new(sink))
            .build()
            .with_context(|| format!("无法连接到 {port}"))?;

        // 会话销毁时 Sender 随之销毁，打印线程自动退出
        thread::Builder::new()
            .name("motor-printer".into())
            .spawn(move || {
                for notification in notifications.iter() {
                    println!("{}", utils::describe_notification(&notification));
                }
            })
            .context("无法启动打印线程")?;

        self.controller = Some(controller);
        println!("✅ 已连接到 {port}");
        Ok(())
    }

    /// 断开连接
    pub fn disconnect(&mut self) {
        match self.controller.take() {
            Some(mut controller) => {
                println!("⏳ 断开连接...");
                controller.disconnect();
            },
            None => println!("⚠️  未连接"),
        }
    }

    /// Ctrl+C：发送 `PARAR`
    pub fn emergency_stop(&self) {
        eprintln!("\n🛑 收到 Ctrl+C，发送 PARAR...");
        match self.controller.as_ref() {
            Some(controller) => {
                if let Err(e) = controller.stop() {
                    eprintln!("❌ 停止失败: {e}");
                }
            },
            None => eprintln!("⚠️  未连接"),
        }
    }

    /// 执行一条命令，返回是否继续
    pub fn execute(&mut self, command: ReplCommand) -> Result<bool> {
        match command {
            ReplCommand::Connect(port) => self.connect(port.as_deref())?,
            ReplCommand::Disconnect => self.disconnect(),
            ReplCommand::Power => {
                self.controller()?.toggle_motor_power()?;
            },
            ReplCommand::Stop => self.controller()?.stop()?,
            ReplCommand::Direction(direction) => self.controller()?.set_direction(direction)?,
            ReplCommand::Move { degrees, frequency } => {
                let frequency = frequency.unwrap_or(self.frequency_hz);
                self.controller()?.move_by_angle(degrees, frequency)?;
                println!("⏳ 移动到 {degrees}° @ {frequency} Hz");
            },
            ReplCommand::Frequency(frequency) => {
                self.frequency_hz = validate_frequency(frequency)?;
                println!("✅ 默认频率: {frequency} Hz");
            },
            ReplCommand::Home => self.controller()?.go_home()?,
            ReplCommand::Cal(cal) => self.execute_calibration(cal)?,
            ReplCommand::Status => self.print_status(),
            ReplCommand::Help => print_help(),
            ReplCommand::Exit => {
                if self.controller.is_some() {
                    self.disconnect();
                }
                println!("👋 再见！");
                return Ok(false);
            },
        }
        Ok(true)
    }

    fn execute_calibration(&mut self, command: CalCommand) -> Result<()> {
        let controller = self.controller()?;
        match command {
            CalCommand::Start => {
                controller.start_calibration()?;
                println!("💡 使用 'cal move' 移动到第 1 个点（建议 90°）");
            },
            CalCommand::Move(theoretical) => {
                let step = controller.snapshot().calibration_step;
                let theoretical = match theoretical.or_else(|| suggested_theoretical(step)) {
                    Some(value) => value,
                    None => anyhow::bail!("所有校准点都已采集，请使用 'cal submit'"),
                };
                controller.calibration_move(theoretical)?;
                println!("⏳ 移动到 {theoretical}°，运动结束后用 'cal record <deg>' 输入实测值");
            },
            CalCommand::Record(measured) => controller.record_measurement(measured)?,
            CalCommand::Submit => controller.submit_calibration()?,
            CalCommand::Disable => controller.disable_calibration(),
            CalCommand::Reset => {
                let confirmed =
                    inquire::Confirm::new("确定要把控制器的校准因子恢复为默认值吗？")
                        .with_default(false)
                        .prompt()
                        .map_err(|e| anyhow::anyhow!("用户交互失败: {e}"))?;
                if confirmed {
                    controller.reset_calibration()?;
                } else {
                    println!("❌ 操作已取消");
                }
            },
        }
        Ok(())
    }

    fn print_status(&self) {
        match self.controller.as_ref() {
            Some(controller) => {
                println!("{}", controller.snapshot());
                let metrics = controller.metrics();
                println!(
                    "lines rx: {}  unrecognized: {}  commands tx: {}  send failures: {}",
                    metrics.lines_received,
                    metrics.unrecognized_lines,
                    metrics.commands_sent,
                    metrics.send_failures
                );
            },
            None => println!("link:        disconnected"),
        }
        println!("frequency:   {} Hz", self.frequency_hz);
    }
}

/// REPL 输入（专用输入线程）
pub struct ReplInput {
    command_rx: Receiver<String>,
    ready_tx: Sender<()>,
    _input_thread: thread::JoinHandle<Result<()>>,
}

impl ReplInput {
    /// 创建专用输入线程（保留历史记录）
    pub fn new() -> Self {
        let (command_tx, command_rx) = bounded::<String>(1);
        let (ready_tx, ready_rx) = bounded::<()>(1);

        let input_thread = thread::spawn(move || {
            use rustyline::history::DefaultHistory;

            let mut rl = Editor::<(), DefaultHistory>::new()
                .map_err(|e| anyhow::anyhow!("Failed to initialize readline: {e}"))?;

            let history_path = ".motor_history";
            rl.load_history(history_path).ok(); // 首次运行时不存在

            println!("Motor CLI v{} - 交互式控制面板", env!("CARGO_PKG_VERSION"));
            println!("输入 'help' 查看帮助，'exit' 退出");
            println!();

            loop {
                match rl.readline("motor> ") {
                    Ok(line) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            continue;
                        }
                        let _ = rl.add_history_entry(line.clone());
                        let is_exit = line == "exit" || line == "quit";

                        if command_tx.send(line).is_err() || is_exit {
                            break;
                        }
                        // 等待主线程执行完，避免与确认提示争用终端
                        if ready_rx.recv().is_err() {
                            break;
                        }
                    },

                    Err(rustyline::error::ReadlineError::Interrupted) => {
                        println!("^C");
                        if command_tx.send("SIGINT".to_string()).is_err()
                            || ready_rx.recv().is_err()
                        {
                            break;
                        }
                    },

                    Err(rustyline::error::ReadlineError::Eof) => break,

                    Err(err) => {
                        eprintln!("Error: {err:?}");
                        break;
                    },
                }
            }

            rl.save_history(history_path).ok();
            Ok(())
        });

        Self {
            command_rx,
            ready_tx,
            _input_thread: input_thread,
        }
    }

    /// 通知输入线程显示下一个提示符
    fn ready(&self) {
        let _ = self.ready_tx.send(());
    }
}

/// 运行 REPL 模式
pub fn run_repl(config: CliConfig) -> Result<()> {
    let (interrupt_tx, interrupt_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.try_send(());
    })
    .context("无法安装 Ctrl+C 处理器")?;

    let mut session = ReplSession::new(config);
    let input = ReplInput::new();

    loop {
        select! {
            recv(input.command_rx) -> line => {
                let Ok(line) = line else {
                    // 输入线程退出（Ctrl+D）
                    session.disconnect_quietly();
                    break;
                };

                if line == "SIGINT" {
                    session.emergency_stop();
                    input.ready();
                    continue;
                }

                let keep_going = match parse_command(&line) {
                    Ok(command) => session.execute(command).unwrap_or_else(|err| {
                        eprintln!("❌ Error: {err}");
                        true
                    }),
                    Err(err) => {
                        eprintln!("❌ {err}");
                        println!("💡 输入 'help' 查看可用命令");
                        true
                    },
                };
                if !keep_going {
                    break;
                }
                input.ready();
            }

            recv(interrupt_rx) -> _ => session.emergency_stop(),
        }
    }

    Ok(())
}

impl ReplSession {
    fn disconnect_quietly(&mut self) {
        if let Some(mut controller) = self.controller.take() {
            controller.disconnect();
        }
    }
}

/// 打印帮助信息
fn print_help() {
    println!("可用命令:");
    println!("  connect [port]            连接到控制器（缺省时使用配置或第一个串口）");
    println!("  disconnect                断开连接（先发送 PARAR/DESABILITAR）");
    println!("  power                     切换电机使能");
    println!("  stop                      停止电机");
    println!("  dir fwd|rev               设置旋转方向");
    println!("  move <deg> [hz]           移动到角度（0-360），频率 1-200 Hz");
    println!("  freq <hz>                 设置默认频率");
    println!("  home                      回零");
    println!("  cal start                 开始三点校准");
    println!("  cal move [deg]            移动到当前校准点（建议 90/180/270）");
    println!("  cal record <deg>          记录当前点的实测角度");
    println!("  cal submit                提交三个校准点");
    println!("  cal disable               放弃校准");
    println!("  cal reset                 恢复控制器默认校准因子");
    println!("  status                    显示当前状态");
    println!("  help                      显示帮助");
    println!("  exit                      退出");
}
