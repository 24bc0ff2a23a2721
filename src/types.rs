use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};

/// Message type tag identifying each frame variant on the wire
///
/// The tag is the first payload byte of every frame. The set was captured
/// from the console-to-client traffic of a Sole F80; tags outside the known
/// set are preserved in [`MessageType::Unknown`] so they can be logged and
/// re-encoded byte-exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    /// Acknowledgement of a previously received frame
    Ack,
    /// Request a workout mode change
    SetWorkoutMode,
    /// Current workout mode, broadcast by the console
    WorkoutMode,
    /// Workout time/calorie target
    WorkoutTarget,
    /// Periodic workout telemetry sample
    WorkoutData,
    /// User profile (sex, age, weight, height)
    UserProfile,
    /// Workout program selection
    Program,
    /// Heart rate source configuration
    HeartRateType,
    /// Console error report
    ErrorCode,
    /// Current belt speed
    Speed,
    /// Current deck incline
    Incline,
    /// Current resistance level
    Level,
    /// Current belt RPM
    Rpm,
    /// Current heart rate reading
    HeartRate,
    /// Target heart rate for HR-controlled programs
    TargetHeartRate,
    /// Maximum speed supported by the device
    MaxSpeed,
    /// Maximum incline supported by the device
    MaxIncline,
    /// Maximum resistance level supported by the device
    MaxLevel,
    /// User-selected incline
    UserIncline,
    /// User-selected level
    UserLevel,
    /// Workout summary sent when a workout ends
    EndWorkout,
    /// Program profile graph data
    ProgramGraphics,
    /// Device model and capability report
    DeviceInfo,
    /// One-shot console command (start, level up/down, stop)
    Command,
    /// Tag outside the known set, raw value preserved
    Unknown(u8),
}

impl From<u8> for MessageType {
    fn from(value: u8) -> Self {
        match value {
            0x00 => Self::Ack,
            0x02 => Self::SetWorkoutMode,
            0x03 => Self::WorkoutMode,
            0x04 => Self::WorkoutTarget,
            0x06 => Self::WorkoutData,
            0x07 => Self::UserProfile,
            0x08 => Self::Program,
            0x09 => Self::HeartRateType,
            0x10 => Self::ErrorCode,
            0x11 => Self::Speed,
            0x12 => Self::Incline,
            0x13 => Self::Level,
            0x14 => Self::Rpm,
            0x15 => Self::HeartRate,
            0x20 => Self::TargetHeartRate,
            0x21 => Self::MaxSpeed,
            0x22 => Self::MaxIncline,
            0x23 => Self::MaxLevel,
            0x25 => Self::UserIncline,
            0x27 => Self::UserLevel,
            0x32 => Self::EndWorkout,
            0x40 => Self::ProgramGraphics,
            0xF0 => Self::DeviceInfo,
            0xF1 => Self::Command,
            other => Self::Unknown(other),
        }
    }
}

impl From<MessageType> for u8 {
    fn from(value: MessageType) -> Self {
        match value {
            MessageType::Ack => 0x00,
            MessageType::SetWorkoutMode => 0x02,
            MessageType::WorkoutMode => 0x03,
            MessageType::WorkoutTarget => 0x04,
            MessageType::WorkoutData => 0x06,
            MessageType::UserProfile => 0x07,
            MessageType::Program => 0x08,
            MessageType::HeartRateType => 0x09,
            MessageType::ErrorCode => 0x10,
            MessageType::Speed => 0x11,
            MessageType::Incline => 0x12,
            MessageType::Level => 0x13,
            MessageType::Rpm => 0x14,
            MessageType::HeartRate => 0x15,
            MessageType::TargetHeartRate => 0x20,
            MessageType::MaxSpeed => 0x21,
            MessageType::MaxIncline => 0x22,
            MessageType::MaxLevel => 0x23,
            MessageType::UserIncline => 0x25,
            MessageType::UserLevel => 0x27,
            MessageType::EndWorkout => 0x32,
            MessageType::ProgramGraphics => 0x40,
            MessageType::DeviceInfo => 0xF0,
            MessageType::Command => 0xF1,
            MessageType::Unknown(other) => other,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ack => write!(f, "ACK"),
            Self::SetWorkoutMode => write!(f, "SetWorkoutMode"),
            Self::WorkoutMode => write!(f, "WorkoutMode"),
            Self::WorkoutTarget => write!(f, "WorkoutTarget"),
            Self::WorkoutData => write!(f, "WorkoutData"),
            Self::UserProfile => write!(f, "UserProfile"),
            Self::Program => write!(f, "Program"),
            Self::HeartRateType => write!(f, "HeartRateType"),
            Self::ErrorCode => write!(f, "ErrorCode"),
            Self::Speed => write!(f, "Speed"),
            Self::Incline => write!(f, "Incline"),
            Self::Level => write!(f, "Level"),
            Self::Rpm => write!(f, "RPM"),
            Self::HeartRate => write!(f, "HeartRate"),
            Self::TargetHeartRate => write!(f, "TargetHeartRate"),
            Self::MaxSpeed => write!(f, "MaxSpeed"),
            Self::MaxIncline => write!(f, "MaxIncline"),
            Self::MaxLevel => write!(f, "MaxLevel"),
            Self::UserIncline => write!(f, "UserIncline"),
            Self::UserLevel => write!(f, "UserLevel"),
            Self::EndWorkout => write!(f, "EndWorkout"),
            Self::ProgramGraphics => write!(f, "ProgramGraphics"),
            Self::DeviceInfo => write!(f, "DeviceInfo"),
            Self::Command => write!(f, "Command"),
            Self::Unknown(_) => write!(f, "Unknown"),
        }
    }
}

/// Workout mode reported and commanded through tags 0x02/0x03
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkoutMode {
    /// Console is idle at the home screen
    Idle,
    /// Workout is being programmed / about to start
    Start,
    /// Belt is running
    Running,
    /// Workout is paused
    Pause,
    /// Workout has completed
    Done,
    /// Mode byte outside the known set
    Unknown(u8),
}

impl From<u8> for WorkoutMode {
    fn from(value: u8) -> Self {
        match value {
            0x01 => Self::Idle,
            0x02 => Self::Start,
            0x04 => Self::Running,
            0x06 => Self::Pause,
            0x07 => Self::Done,
            other => Self::Unknown(other),
        }
    }
}

impl From<WorkoutMode> for u8 {
    fn from(value: WorkoutMode) -> Self {
        match value {
            WorkoutMode::Idle => 0x01,
            WorkoutMode::Start => 0x02,
            WorkoutMode::Running => 0x04,
            WorkoutMode::Pause => 0x06,
            WorkoutMode::Done => 0x07,
            WorkoutMode::Unknown(other) => other,
        }
    }
}

impl fmt::Display for WorkoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Start => write!(f, "Start"),
            Self::Running => write!(f, "Running"),
            Self::Pause => write!(f, "Pause"),
            Self::Done => write!(f, "Done"),
            Self::Unknown(_) => write!(f, "Unknown"),
        }
    }
}

/// Sex field of the user profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SexType {
    /// Male
    Male,
    /// Female
    Female,
    /// Value outside the known set
    Unknown(u8),
}

impl From<u8> for SexType {
    fn from(value: u8) -> Self {
        match value {
            0x01 => Self::Male,
            0x02 => Self::Female,
            other => Self::Unknown(other),
        }
    }
}

impl From<SexType> for u8 {
    fn from(value: SexType) -> Self {
        match value {
            SexType::Male => 0x01,
            SexType::Female => 0x02,
            SexType::Unknown(other) => other,
        }
    }
}

impl fmt::Display for SexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Male => write!(f, "Male"),
            Self::Female => write!(f, "Female"),
            Self::Unknown(_) => write!(f, "Unknown"),
        }
    }
}

/// Display units reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitsType {
    /// Kilometers / kilograms
    Metric,
    /// Miles / pounds
    Imperial,
    /// Value outside the known set
    Unknown(u8),
}

impl From<u8> for UnitsType {
    fn from(value: u8) -> Self {
        match value {
            0x00 => Self::Metric,
            0x01 => Self::Imperial,
            other => Self::Unknown(other),
        }
    }
}

impl From<UnitsType> for u8 {
    fn from(value: UnitsType) -> Self {
        match value {
            UnitsType::Metric => 0x00,
            UnitsType::Imperial => 0x01,
            UnitsType::Unknown(other) => other,
        }
    }
}

impl fmt::Display for UnitsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metric => write!(f, "Metric"),
            Self::Imperial => write!(f, "Imperial"),
            Self::Unknown(_) => write!(f, "Unknown"),
        }
    }
}

/// One-shot console command carried by tag 0xF1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandType {
    /// Start the belt
    Start,
    /// Increase the level by one step
    LevelUp,
    /// Decrease the level by one step
    LevelDown,
    /// Stop the belt
    Stop,
    /// Command byte outside the known set
    Unknown(u8),
}

impl From<u8> for CommandType {
    fn from(value: u8) -> Self {
        match value {
            0x01 => Self::Start,
            0x02 => Self::LevelUp,
            0x03 => Self::LevelDown,
            0x06 => Self::Stop,
            other => Self::Unknown(other),
        }
    }
}

impl From<CommandType> for u8 {
    fn from(value: CommandType) -> Self {
        match value {
            CommandType::Start => 0x01,
            CommandType::LevelUp => 0x02,
            CommandType::LevelDown => 0x03,
            CommandType::Stop => 0x06,
            CommandType::Unknown(other) => other,
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "Start"),
            Self::LevelUp => write!(f, "LevelUp"),
            Self::LevelDown => write!(f, "LevelDown"),
            Self::Stop => write!(f, "Stop"),
            Self::Unknown(_) => write!(f, "Unknown"),
        }
    }
}

/// Workout program selector, a 16-bit big-endian code on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Program {
    /// Manual speed/incline control
    Manual,
    /// Hill profile
    Hill,
    /// Fat burn profile
    FatBurn,
    /// Cardio profile
    Cardio,
    /// Strength profile
    Strength,
    /// Interval profile
    Interval,
    /// User-defined program slot 1
    User1,
    /// User-defined program slot 2
    User2,
    /// Heart-rate controlled program 1
    Hr1,
    /// Heart-rate controlled program 2
    Hr2,
    /// Fusion program
    Fusion,
    /// Program code outside the known set
    Unknown(u16),
}

impl From<u16> for Program {
    fn from(value: u16) -> Self {
        match value {
            0x1001 => Self::Manual,
            0x2002 => Self::Hill,
            0x2003 => Self::FatBurn,
            0x2004 => Self::Cardio,
            0x2005 => Self::Strength,
            0x2006 => Self::Interval,
            0x3007 => Self::User1,
            0x3008 => Self::User2,
            0x3009 => Self::Hr1,
            0x300A => Self::Hr2,
            0x600C => Self::Fusion,
            other => Self::Unknown(other),
        }
    }
}

impl From<Program> for u16 {
    fn from(value: Program) -> Self {
        match value {
            Program::Manual => 0x1001,
            Program::Hill => 0x2002,
            Program::FatBurn => 0x2003,
            Program::Cardio => 0x2004,
            Program::Strength => 0x2005,
            Program::Interval => 0x2006,
            Program::User1 => 0x3007,
            Program::User2 => 0x3008,
            Program::Hr1 => 0x3009,
            Program::Hr2 => 0x300A,
            Program::Fusion => 0x600C,
            Program::Unknown(other) => other,
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => write!(f, "Manual"),
            Self::Hill => write!(f, "Hill"),
            Self::FatBurn => write!(f, "FatBurn"),
            Self::Cardio => write!(f, "Cardio"),
            Self::Strength => write!(f, "Strength"),
            Self::Interval => write!(f, "Interval"),
            Self::User1 => write!(f, "User1"),
            Self::User2 => write!(f, "User2"),
            Self::Hr1 => write!(f, "HR1"),
            Self::Hr2 => write!(f, "HR2"),
            Self::Fusion => write!(f, "Fusion"),
            Self::Unknown(_) => write!(f, "Unknown"),
        }
    }
}

/// Device model byte from the device info report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceModel {
    /// Sole F80
    F80,
    /// Model byte outside the known set
    Unknown(u8),
}

impl From<u8> for DeviceModel {
    fn from(value: u8) -> Self {
        match value {
            146 => Self::F80,
            other => Self::Unknown(other),
        }
    }
}

impl From<DeviceModel> for u8 {
    fn from(value: DeviceModel) -> Self {
        match value {
            DeviceModel::F80 => 146,
            DeviceModel::Unknown(other) => other,
        }
    }
}

impl fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::F80 => write!(f, "F80"),
            Self::Unknown(_) => write!(f, "Unknown"),
        }
    }
}

/// Session tuning knobs
///
/// The defaults are empirical values taken from traffic captures against
/// the real console: the console occasionally drops writes, wants 300 ms
/// between retransmissions, and takes roughly five seconds to come back
/// after dropping the link when a workout starts.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum writes of one request before giving up on a response
    pub write_attempts: u32,
    /// Minimum gap between retransmissions of the same request
    pub write_gap: Duration,
    /// Pause between closing the link and reconnecting during workout start
    pub restart_delay: Duration,
    /// Reconnection attempts after the workout-start link drop
    pub reconnect_attempts: u32,
    /// How long the BLE connector scans for the device address
    pub scan_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            write_attempts: 10,
            write_gap: Duration::from_millis(300),
            restart_delay: Duration::from_secs(5),
            reconnect_attempts: 5,
            scan_timeout: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_round_trip() {
        for tag in 0x00..=0xFF {
            let ty = MessageType::from(tag);
            assert_eq!(u8::from(ty), tag);
        }
    }

    #[test]
    fn test_message_type_known_tags() {
        assert_eq!(MessageType::from(0x00), MessageType::Ack);
        assert_eq!(MessageType::from(0x06), MessageType::WorkoutData);
        assert_eq!(MessageType::from(0xF0), MessageType::DeviceInfo);
        assert_eq!(MessageType::from(0xF1), MessageType::Command);
        assert_eq!(MessageType::from(0x99), MessageType::Unknown(0x99));
    }

    #[test]
    fn test_workout_mode_round_trip() {
        assert_eq!(WorkoutMode::from(0x01), WorkoutMode::Idle);
        assert_eq!(WorkoutMode::from(0x02), WorkoutMode::Start);
        assert_eq!(WorkoutMode::from(0x04), WorkoutMode::Running);
        assert_eq!(u8::from(WorkoutMode::Pause), 0x06);
        assert_eq!(u8::from(WorkoutMode::Unknown(0x55)), 0x55);
    }

    #[test]
    fn test_program_codes() {
        assert_eq!(Program::from(0x1001), Program::Manual);
        assert_eq!(Program::from(0x600C), Program::Fusion);
        assert_eq!(u16::from(Program::Hr2), 0x300A);
        assert_eq!(Program::from(0xBEEF), Program::Unknown(0xBEEF));
        assert_eq!(u16::from(Program::Unknown(0xBEEF)), 0xBEEF);
    }

    #[test]
    fn test_device_model() {
        assert_eq!(DeviceModel::from(146), DeviceModel::F80);
        assert_eq!(format!("{}", DeviceModel::F80), "F80");
        assert_eq!(format!("{}", DeviceModel::Unknown(3)), "Unknown");
    }

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::default();

        assert_eq!(config.write_attempts, 10);
        assert_eq!(config.write_gap, Duration::from_millis(300));
        assert_eq!(config.restart_delay, Duration::from_secs(5));
        assert_eq!(config.reconnect_attempts, 5);
        assert_eq!(config.scan_timeout, Duration::from_secs(10));
    }
}
