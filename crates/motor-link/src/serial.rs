//! 串口链路实现
//!
//! 基于 `serialport` crate，将字节流切分为文本行。
//!
//! # 线程模型
//!
//! `split()` 通过 `try_clone()` 复制底层句柄：
//! - `SerialRx` 移动到后台接收线程
//! - `SerialTx` 留在操作员线程
//!
//! 两半共享一个 `closed` 标志，`SerialTx::close()` 后接收半部在下一次轮询时退出。

use crate::{LineRx, LineTx, LinkDeviceError, LinkDeviceErrorKind, LinkError, SplittableLink};
use serialport::{SerialPort, SerialPortType};
use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, trace};

/// 单次读取的缓冲区大小
const READ_CHUNK_SIZE: usize = 256;

/// 单行最大长度，超过后整行丢弃直到下一个换行符
const MAX_LINE_LEN: usize = 4096;

/// 串口默认读超时
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// 行切分器
///
/// 以 `\n` 为分隔符，去除首尾空白（含 `\r`），无法解码的字节按 UTF-8 替换字符处理，
/// 空行被丢弃。
#[derive(Debug, Default)]
pub struct LineFramer {
    pending: Vec<u8>,
    ready: VecDeque<String>,
    /// 当前行已超长，丢弃到下一个 `\n`
    discarding: bool,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加收到的字节
    pub fn push(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            if byte == b'\n' {
                let raw = std::mem::take(&mut self.pending);
                if std::mem::take(&mut self.discarding) {
                    continue;
                }
                let line = String::from_utf8_lossy(&raw).trim().to_string();
                if !line.is_empty() {
                    self.ready.push_back(line);
                }
            } else if self.discarding {
                continue;
            } else if self.pending.len() < MAX_LINE_LEN {
                self.pending.push(byte);
            } else {
                trace!("Line exceeds {} bytes, discarding until newline", MAX_LINE_LEN);
                self.pending.clear();
                self.discarding = true;
            }
        }
    }

    /// 取出下一行完整文本
    pub fn next_line(&mut self) -> Option<String> {
        self.ready.pop_front()
    }

    /// 已缓冲但尚未遇到换行符的字节数
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// 串口链路（未拆分）
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    path: String,
}

impl SerialLink {
    /// 打开串口
    ///
    /// # 参数
    /// - `path`: 端口名（如 `/dev/ttyUSB0`、`COM12`）
    /// - `baud_rate`: 波特率（控制器默认 115200）
    /// - `read_timeout`: 初始读超时
    pub fn open(path: &str, baud_rate: u32, read_timeout: Duration) -> Result<Self, LinkError> {
        let port = serialport::new(path, baud_rate)
            .timeout(read_timeout)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => LinkError::Device(LinkDeviceError::new(
                    LinkDeviceErrorKind::NotFound,
                    format!("{path}: {e}"),
                )),
                serialport::ErrorKind::Io(ErrorKind::PermissionDenied) => {
                    LinkError::Device(LinkDeviceError::new(
                        LinkDeviceErrorKind::AccessDenied,
                        format!("{path}: {e}"),
                    ))
                },
                _ => LinkError::Serial(e),
            })?;

        info!("Serial port {} opened at {} baud", path, baud_rate);

        Ok(Self {
            port,
            path: path.to_string(),
        })
    }
}

impl SplittableLink for SerialLink {
    type Rx = SerialRx;
    type Tx = SerialTx;

    fn split(self) -> Result<(SerialRx, SerialTx), LinkError> {
        let reader = self.port.try_clone()?;
        let closed = Arc::new(AtomicBool::new(false));

        let rx = SerialRx {
            port: reader,
            framer: LineFramer::new(),
            timeout: None,
            closed: closed.clone(),
        };
        let tx = SerialTx {
            port: self.port,
            path: self.path,
            closed,
        };
        Ok((rx, tx))
    }
}

/// 串口接收半部
pub struct SerialRx {
    port: Box<dyn SerialPort>,
    framer: LineFramer,
    /// 当前已设置到端口的读超时（避免每次轮询都调用 set_timeout）
    timeout: Option<Duration>,
    closed: Arc<AtomicBool>,
}

impl LineRx for SerialRx {
    fn receive_line(&mut self, timeout: Duration) -> Result<Option<String>, LinkError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LinkError::Closed);
        }

        if let Some(line) = self.framer.next_line() {
            return Ok(Some(line));
        }

        if self.timeout != Some(timeout) {
            self.port.set_timeout(timeout)?;
            self.timeout = Some(timeout);
        }

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        match self.port.read(&mut chunk) {
            // 零长度读取等同于超时
            Ok(0) => Ok(None),
            Ok(n) => {
                self.framer.push(&chunk[..n]);
                Ok(self.framer.next_line())
            },
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            },
            Err(e) => Err(LinkError::Io(e)),
        }
    }
}

/// 串口发送半部
pub struct SerialTx {
    port: Box<dyn SerialPort>,
    path: String,
    closed: Arc<AtomicBool>,
}

impl LineTx for SerialTx {
    fn send_line(&mut self, line: &str) -> Result<(), LinkError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LinkError::Closed);
        }

        let mut frame = String::with_capacity(line.len() + 1);
        frame.push_str(line);
        frame.push('\n');

        self.port.write_all(frame.as_bytes())?;
        self.port.flush()?;
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("Serial port {} closed", self.path);
        }
    }
}

/// 可用串口摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSummary {
    /// 端口名
    pub name: String,
    /// 端口类型描述（USB 设备会带上厂商/产品信息）
    pub description: String,
}

/// 枚举系统中可用的串口
pub fn list_ports() -> Result<Vec<PortSummary>, LinkError> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .map(|info| PortSummary {
            description: describe_port_type(&info.port_type),
            name: info.port_name,
        })
        .collect())
}

fn describe_port_type(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => {
            let product = usb.product.as_deref().unwrap_or("USB serial");
            match usb.manufacturer.as_deref() {
                Some(manufacturer) => format!(
                    "{product} ({manufacturer}, {:04x}:{:04x})",
                    usb.vid, usb.pid
                ),
                None => format!("{product} ({:04x}:{:04x})", usb.vid, usb.pid),
            }
        },
        SerialPortType::PciPort => "PCI".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth".to_string(),
        SerialPortType::Unknown => "Unknown".to_string(),
    }
}

/// 选择要连接的端口
///
/// 如果配置的默认端口存在则使用它，否则使用第一个可用端口。
pub fn preferred_port<'a>(ports: &'a [PortSummary], configured: Option<&str>) -> Option<&'a str> {
    if let Some(wanted) = configured
        && let Some(port) = ports.iter().find(|p| p.name == wanted)
    {
        return Some(port.name.as_str());
    }
    ports.first().map(|p| p.name.as_str())
}
