//! 倒计时 - 业务能力层
//!
//! 只负责"还剩多少秒"，到 0 时报告一次过期，不关心提交

/// 计时器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// 尚未开始
    Idle { remaining_secs: u64 },
    /// 正在倒计时
    Running { remaining_secs: u64 },
    /// 已归零，不可逆
    Expired,
    /// 提交成功后停止
    Halted { remaining_secs: u64 },
}

/// 单次 tick 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// 计时器不在运行，忽略
    Ignored,
    /// 仍在倒计时
    Remaining(u64),
    /// 本次 tick 归零（只会出现一次）
    Expired,
}

/// 倒计时器
#[derive(Debug, Clone)]
pub struct CountdownTimer {
    state: TimerState,
}

impl CountdownTimer {
    pub fn new(total_secs: u64) -> Self {
        Self {
            state: TimerState::Idle {
                remaining_secs: total_secs,
            },
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn remaining_secs(&self) -> u64 {
        match self.state {
            TimerState::Idle { remaining_secs }
            | TimerState::Running { remaining_secs }
            | TimerState::Halted { remaining_secs } => remaining_secs,
            TimerState::Expired => 0,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, TimerState::Running { .. })
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.state, TimerState::Expired)
    }

    /// Idle → Running，返回是否发生了转换
    ///
    /// 时长为 0 的试卷直接进入 Expired
    pub fn start(&mut self) -> bool {
        match self.state {
            TimerState::Idle { remaining_secs: 0 } => {
                self.state = TimerState::Expired;
                true
            }
            TimerState::Idle { remaining_secs } => {
                self.state = TimerState::Running { remaining_secs };
                true
            }
            _ => false,
        }
    }

    /// 每秒调用一次
    pub fn tick(&mut self) -> TickOutcome {
        match self.state {
            TimerState::Running { remaining_secs } if remaining_secs <= 1 => {
                self.state = TimerState::Expired;
                TickOutcome::Expired
            }
            TimerState::Running { remaining_secs } => {
                let remaining_secs = remaining_secs - 1;
                self.state = TimerState::Running { remaining_secs };
                TickOutcome::Remaining(remaining_secs)
            }
            _ => TickOutcome::Ignored,
        }
    }

    /// Running → Halted
    pub fn halt(&mut self) {
        if let TimerState::Running { remaining_secs } = self.state {
            self.state = TimerState::Halted { remaining_secs };
        }
    }
}

/// 把秒数格式化成 `MM:SS`，超过一小时显示 `H:MM:SS`
pub fn format_clock(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}
