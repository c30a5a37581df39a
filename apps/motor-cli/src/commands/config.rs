//! 配置管理命令
//!
//! 用于管理 CLI 配置（串口、波特率、默认频率等），存储为 TOML。

use anyhow::{Context, Result};
use clap::Subcommand;
use motor_protocol::{DEFAULT_BAUD_RATE, DEFAULT_FREQUENCY_HZ, validate_frequency};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 默认接收轮询间隔（毫秒）
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

/// 默认配置文件路径：`<config_dir>/motor-cli/config.toml`
pub fn default_config_path() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;
    path.push("motor-cli");
    path.push("config.toml");
    Ok(path)
}

/// 解析配置文件路径（`--config` 优先）
pub fn resolve_config_path(override_path: Option<&Path>) -> Result<PathBuf> {
    match override_path {
        Some(path) => Ok(path.to_path_buf()),
        None => default_config_path(),
    }
}

/// CLI 配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// 默认串口
    pub port: Option<String>,

    /// 波特率
    pub baud_rate: Option<u32>,

    /// 默认步进频率（Hz）
    pub frequency_hz: Option<u32>,

    /// 接收轮询间隔（毫秒）
    pub poll_interval_ms: Option<u64>,
}

impl CliConfig {
    /// 加载配置（文件不存在时返回默认配置）
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("解析配置文件失败: {}", path.display()))
    }

    /// 保存配置
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).context("创建配置目录失败")?;
        }

        let content = toml::to_string_pretty(self).context("序列化配置失败")?;
        fs::write(path, format!("# Motor CLI Configuration\n\n{content}"))
            .context("写入配置文件失败")?;
        Ok(())
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate.unwrap_or(DEFAULT_BAUD_RATE)
    }

    pub fn frequency_hz(&self) -> u32 {
        self.frequency_hz.unwrap_or(DEFAULT_FREQUENCY_HZ)
    }

    pub fn poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS)
    }

    /// 校验配置值，返回发现的问题
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.baud_rate == Some(0) {
            problems.push("baud_rate 必须大于 0".to_string());
        }
        if let Some(frequency) = self.frequency_hz
            && let Err(e) = validate_frequency(frequency)
        {
            problems.push(format!("frequency_hz: {e}"));
        }
        if self.poll_interval_ms == Some(0) {
            problems.push("poll_interval_ms 必须大于 0".to_string());
        }
        problems
    }
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 设置配置项
    Set {
        /// 默认串口（如 /dev/ttyUSB0, COM3）
        #[arg(short, long)]
        port: Option<String>,

        /// 波特率
        #[arg(short, long)]
        baud_rate: Option<u32>,

        /// 默认步进频率（Hz, 1-200）
        #[arg(short, long)]
        frequency: Option<u32>,

        /// 接收轮询间隔（毫秒）
        #[arg(long)]
        poll_interval_ms: Option<u64>,
    },

    /// 获取配置项
    Get {
        /// 配置项名称（port, baud_rate, frequency_hz, poll_interval_ms, all）
        #[arg(default_value = "all")]
        key: String,
    },

    /// 检查配置
    Check,
}

impl ConfigCommand {
    pub fn execute(self, path: &Path) -> Result<()> {
        match self {
            ConfigCommand::Set {
                port,
                baud_rate,
                frequency,
                poll_interval_ms,
            } => Self::set_(path, port, baud_rate, frequency, poll_interval_ms),

            ConfigCommand::Get { key } => Self::get_(path, &key),

            ConfigCommand::Check => Self::check_(path),
        }
    }

    fn set_(
        path: &Path,
        port: Option<String>,
        baud_rate: Option<u32>,
        frequency: Option<u32>,
        poll_interval_ms: Option<u64>,
    ) -> Result<()> {
        let mut config = CliConfig::load(path)?;

        if let Some(port) = port {
            println!("✅ 设置默认串口: {port}");
            config.port = Some(port);
        }

        if let Some(baud_rate) = baud_rate {
            if baud_rate == 0 {
                anyhow::bail!("波特率必须大于 0");
            }
            println!("✅ 设置波特率: {baud_rate}");
            config.baud_rate = Some(baud_rate);
        }

        if let Some(frequency) = frequency {
            validate_frequency(frequency)?;
            println!("✅ 设置默认频率: {frequency} Hz");
            config.frequency_hz = Some(frequency);
        }

        if let Some(interval) = poll_interval_ms {
            if interval == 0 {
                anyhow::bail!("轮询间隔必须大于 0");
            }
            println!("✅ 设置轮询间隔: {interval} ms");
            config.poll_interval_ms = Some(interval);
        }

        config.save(path)?;
        Ok(())
    }

    fn get_(path: &Path, key: &str) -> Result<()> {
        let config = CliConfig::load(path)?;

        match key {
            "port" => match config.port {
                Some(ref port) => println!("{port}"),
                None => println!("(未设置)"),
            },
            "baud_rate" => println!("{}", config.baud_rate()),
            "frequency_hz" => println!("{}", config.frequency_hz()),
            "poll_interval_ms" => println!("{}", config.poll_interval_ms()),
            "all" => print_config(&config),
            other => anyhow::bail!("未知配置项: {other}"),
        }

        Ok(())
    }

    fn check_(path: &Path) -> Result<()> {
        let config = CliConfig::load(path)?;

        println!("配置文件: {}", path.display());
        print_config(&config);

        if let Some(ref port) = config.port {
            match motor_link::list_ports() {
                Ok(ports) if ports.iter().any(|p| &p.name == port) => {
                    println!("✅ 串口 {port} 可用");
                },
                Ok(_) => println!("⚠️  串口 {port} 当前不可用"),
                Err(e) => println!("⚠️  无法枚举串口: {e}"),
            }
        }

        let problems = config.problems();
        if problems.is_empty() {
            println!("✅ 配置有效");
            Ok(())
        } else {
            for problem in &problems {
                println!("❌ {problem}");
            }
            anyhow::bail!("配置无效（{} 个问题）", problems.len())
        }
    }
}

fn print_config(config: &CliConfig) {
    println!("Motor CLI 配置:");
    println!("  串口: {}", config.port.as_deref().unwrap_or("(自动选择)"));
    println!("  波特率: {}", config.baud_rate());
    println!("  默认频率: {} Hz", config.frequency_hz());
    println!("  轮询间隔: {} ms", config.poll_interval_ms());
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = CliConfig::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.baud_rate(), 115_200);
        assert_eq!(config.frequency_hz(), 50);
        assert_eq!(config.poll_interval_ms(), 10);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = CliConfig {
            port: Some("/dev/ttyUSB0".to_string()),
            baud_rate: Some(9600),
            frequency_hz: Some(120),
            poll_interval_ms: None,
        };
        config.save(&path).unwrap();

        assert_eq!(CliConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "port = \"COM3\"\n").unwrap();

        let config = CliConfig::load(&path).unwrap();
        assert_eq!(config.port.as_deref(), Some("COM3"));
        assert_eq!(config.baud_rate(), 115_200);
    }

    #[test]
    fn test_invalid_toml_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "port = [").unwrap();

        let err = CliConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("config.toml"));
    }

    #[test]
    fn test_problems() {
        let config = CliConfig {
            frequency_hz: Some(500),
            poll_interval_ms: Some(0),
            ..Default::default()
        };
        assert_eq!(config.problems().len(), 2);
        assert!(CliConfig::default().problems().is_empty());
    }

    #[test]
    fn test_set_rejects_bad_frequency() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cmd = ConfigCommand::Set {
            port: None,
            baud_rate: None,
            frequency: Some(0),
            poll_interval_ms: None,
        };
        assert!(cmd.execute(&path).is_err());
        assert!(!path.exists());
    }
}
