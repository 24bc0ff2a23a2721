use crate::{
    error::{Result, TreadmillError},
    frame::{self, to_hex},
    types::{CommandType, DeviceModel, MessageType, Program, SexType, UnitsType, WorkoutMode},
};
use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trailer bytes carried by every ACK frame (`"OK"`)
pub const ACK_TRAILER: [u8; 2] = [0x4F, 0x4B];

/// Periodic telemetry sample broadcast by the console while a workout runs
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutData {
    /// Elapsed minutes
    pub minute: u8,
    /// Elapsed seconds within the current minute
    pub second: u8,
    /// Distance covered so far
    pub distance: u16,
    /// Calories burned so far
    pub calories: u16,
    /// Current heart rate reading
    pub heart_rate: u8,
    /// Current belt speed
    pub speed: u8,
    /// Current deck incline
    pub incline: u8,
    /// Heart rate source, passed through opaquely
    pub hr_type: u8,
    /// Interval timer
    pub interval_time: u8,
    /// Recovery timer
    pub recovery_time: u8,
    /// Row of the program profile currently active
    pub program_row: u8,
    /// Column of the program profile currently active
    pub program_column: u8,
}

/// User profile sent to the console before starting a workout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Sex
    pub sex: SexType,
    /// Age in years
    pub age: u8,
    /// Weight (console display units)
    pub weight: u16,
    /// Height (console display units)
    pub height: u8,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            sex: SexType::Male,
            age: 30,
            weight: 155,
            height: 72,
        }
    }
}

/// Workout summary broadcast by the console when a workout ends
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndWorkout {
    /// Total workout time in seconds
    pub seconds: u16,
    /// Total distance
    pub distance: u16,
    /// Total calories
    pub calories: u16,
    /// Final belt speed
    pub speed: u8,
    /// Final heart rate reading
    pub heart_rate: u8,
    /// Final deck incline
    pub incline: u8,
}

/// Device model and capability report returned for a device info request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device model
    pub model: DeviceModel,
    /// Firmware version byte
    pub version: u8,
    /// Display units the console is configured for
    pub units: UnitsType,
    /// Maximum supported speed
    pub max_speed: u8,
    /// Minimum supported speed
    pub min_speed: u8,
    /// Maximum supported incline
    pub incline_max: u8,
    /// User segment byte, passed through opaquely
    pub user_segment: u8,
}

/// A single protocol message, one constructor per wire tag
///
/// Every variant has a fixed decoded length and a deterministic big-endian
/// layout. [`Message::GetDeviceInfo`] is the one asymmetric case: a device
/// info *request* is just the bare tag on the wire, while the inbound
/// *response* decodes into [`Message::DeviceInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Acknowledgement of a previously received frame (tag 0x00)
    Ack {
        /// Tag of the message being acknowledged
        acknowledged: MessageType,
    },
    /// Request a workout mode change (tag 0x02)
    SetWorkoutMode {
        /// Requested mode
        mode: WorkoutMode,
    },
    /// Current workout mode broadcast by the console (tag 0x03)
    WorkoutMode {
        /// Reported mode
        mode: WorkoutMode,
    },
    /// Workout time/calorie target (tag 0x04)
    WorkoutTarget {
        /// Target time in minutes
        time: u8,
        /// Target calories
        calories: u16,
    },
    /// Periodic workout telemetry sample (tag 0x06)
    WorkoutData(WorkoutData),
    /// User profile (tag 0x07)
    UserProfile(UserProfile),
    /// Workout program selection (tag 0x08)
    Program {
        /// Selected program
        program: Program,
    },
    /// Heart rate source configuration (tag 0x09)
    HeartRateType {
        /// Primary heart rate source
        type1: u8,
        /// Secondary byte, always observed as zero; meaning unknown
        type2: u8,
    },
    /// Console error report (tag 0x10)
    ErrorCode {
        /// Device-defined error code, passed through opaquely
        code: u8,
    },
    /// Current belt speed (tag 0x11)
    Speed {
        /// Speed value
        speed: u8,
    },
    /// Current deck incline (tag 0x12)
    Incline {
        /// Incline value
        incline: u8,
    },
    /// Current resistance level (tag 0x13)
    Level {
        /// Level value
        level: u8,
    },
    /// Current belt RPM (tag 0x14)
    Rpm {
        /// RPM value
        rpm: u8,
    },
    /// Current heart rate reading (tag 0x15)
    HeartRate {
        /// Heart rate in BPM
        heart_rate: u8,
    },
    /// Target heart rate (tag 0x20)
    TargetHeartRate {
        /// Target heart rate in BPM
        heart_rate: u8,
    },
    /// Maximum speed supported by the device (tag 0x21)
    MaxSpeed {
        /// Speed value
        speed: u8,
    },
    /// Maximum incline supported by the device (tag 0x22)
    MaxIncline {
        /// Incline value
        max_incline: u8,
    },
    /// Maximum resistance level supported by the device (tag 0x23)
    MaxLevel {
        /// Level value
        level: u8,
    },
    /// User-selected incline (tag 0x25)
    UserIncline {
        /// Incline value
        incline: u8,
    },
    /// User-selected level (tag 0x27)
    UserLevel {
        /// Level value
        level: u8,
    },
    /// Workout summary (tag 0x32)
    EndWorkout(EndWorkout),
    /// Program profile graph data (tag 0x40)
    ProgramGraphics {
        /// Eighteen profile columns
        graph: [u8; 18],
    },
    /// Device info request; encodes as the bare tag 0xF0
    GetDeviceInfo,
    /// Device info response (tag 0xF0, 8 bytes inbound)
    DeviceInfo(DeviceInfo),
    /// One-shot console command (tag 0xF1)
    Command {
        /// Command to execute
        command: CommandType,
    },
}

impl Message {
    /// The wire tag of this message
    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        match self {
            Self::Ack { .. } => MessageType::Ack,
            Self::SetWorkoutMode { .. } => MessageType::SetWorkoutMode,
            Self::WorkoutMode { .. } => MessageType::WorkoutMode,
            Self::WorkoutTarget { .. } => MessageType::WorkoutTarget,
            Self::WorkoutData(_) => MessageType::WorkoutData,
            Self::UserProfile(_) => MessageType::UserProfile,
            Self::Program { .. } => MessageType::Program,
            Self::HeartRateType { .. } => MessageType::HeartRateType,
            Self::ErrorCode { .. } => MessageType::ErrorCode,
            Self::Speed { .. } => MessageType::Speed,
            Self::Incline { .. } => MessageType::Incline,
            Self::Level { .. } => MessageType::Level,
            Self::Rpm { .. } => MessageType::Rpm,
            Self::HeartRate { .. } => MessageType::HeartRate,
            Self::TargetHeartRate { .. } => MessageType::TargetHeartRate,
            Self::MaxSpeed { .. } => MessageType::MaxSpeed,
            Self::MaxIncline { .. } => MessageType::MaxIncline,
            Self::MaxLevel { .. } => MessageType::MaxLevel,
            Self::UserIncline { .. } => MessageType::UserIncline,
            Self::UserLevel { .. } => MessageType::UserLevel,
            Self::EndWorkout(_) => MessageType::EndWorkout,
            Self::ProgramGraphics { .. } => MessageType::ProgramGraphics,
            Self::GetDeviceInfo | Self::DeviceInfo(_) => MessageType::DeviceInfo,
            Self::Command { .. } => MessageType::Command,
        }
    }

    /// The serialized payload length of this message, tag byte included
    ///
    /// For [`Message::GetDeviceInfo`] this is the one-byte request length;
    /// the request form never goes through the inbound length check.
    #[must_use]
    pub const fn expected_length(&self) -> usize {
        match self {
            Self::GetDeviceInfo => 1,
            Self::SetWorkoutMode { .. }
            | Self::WorkoutMode { .. }
            | Self::ErrorCode { .. }
            | Self::Speed { .. }
            | Self::Incline { .. }
            | Self::Level { .. }
            | Self::Rpm { .. }
            | Self::HeartRate { .. }
            | Self::TargetHeartRate { .. }
            | Self::MaxSpeed { .. }
            | Self::MaxIncline { .. }
            | Self::MaxLevel { .. }
            | Self::UserIncline { .. }
            | Self::UserLevel { .. }
            | Self::Command { .. } => 2,
            Self::Program { .. } | Self::HeartRateType { .. } => 3,
            Self::Ack { .. } => 4,
            Self::WorkoutTarget { .. } => 5,
            Self::UserProfile(_) => 6,
            Self::DeviceInfo(_) => 8,
            Self::EndWorkout(_) => 10,
            Self::WorkoutData(_) => 15,
            Self::ProgramGraphics { .. } => 19,
        }
    }

    /// Parse a full wire frame into a message
    ///
    /// Strips the envelope, then decodes the payload by tag.
    ///
    /// # Errors
    ///
    /// Returns [`TreadmillError::Framing`] for envelope violations,
    /// [`TreadmillError::UnknownType`] for tags outside the closed set, and
    /// [`TreadmillError::InvalidMessage`] / [`TreadmillError::AckTrailer`]
    /// for per-variant payload violations.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::decode(frame::unwrap(data)?)
    }

    /// Encode this message into a full wire frame, envelope included
    ///
    /// # Errors
    ///
    /// Returns [`TreadmillError::Framing`] if the payload cannot be framed.
    pub fn encode(&self) -> Result<Vec<u8>> {
        frame::wrap(&self.encode_payload())
    }

    /// Decode an unwrapped payload (tag byte first) into a message
    ///
    /// # Errors
    ///
    /// Returns [`TreadmillError::UnknownType`] for tags outside the closed
    /// set, [`TreadmillError::InvalidMessage`] for length violations, and
    /// [`TreadmillError::AckTrailer`] for an ACK missing its `OK` trailer.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let Some(&tag) = payload.first() else {
            return Err(TreadmillError::InvalidMessage(
                "empty payload".to_string(),
            ));
        };

        let ty = MessageType::from(tag);
        match ty {
            MessageType::Ack => {
                check_length(ty, payload, 4)?;
                if payload[2] != ACK_TRAILER[0] || payload[3] != ACK_TRAILER[1] {
                    return Err(TreadmillError::AckTrailer(format!(
                        "expected ack to end with 0x4f4b, but was: 0x{}",
                        to_hex(&payload[2..])
                    )));
                }

                Ok(Self::Ack {
                    acknowledged: MessageType::from(payload[1]),
                })
            }
            MessageType::SetWorkoutMode => {
                check_length(ty, payload, 2)?;
                Ok(Self::SetWorkoutMode {
                    mode: WorkoutMode::from(payload[1]),
                })
            }
            MessageType::WorkoutMode => {
                check_length(ty, payload, 2)?;
                Ok(Self::WorkoutMode {
                    mode: WorkoutMode::from(payload[1]),
                })
            }
            MessageType::WorkoutTarget => {
                check_length(ty, payload, 5)?;
                // Byte 2 is always zero in captures; its purpose is unknown
                // and it is dropped on decode.
                let mut buf = &payload[3..];
                Ok(Self::WorkoutTarget {
                    time: payload[1],
                    calories: buf.get_u16(),
                })
            }
            MessageType::WorkoutData => {
                check_length(ty, payload, 15)?;
                let mut buf = &payload[1..];
                Ok(Self::WorkoutData(WorkoutData {
                    minute: buf.get_u8(),
                    second: buf.get_u8(),
                    distance: buf.get_u16(),
                    calories: buf.get_u16(),
                    heart_rate: buf.get_u8(),
                    speed: buf.get_u8(),
                    incline: buf.get_u8(),
                    hr_type: buf.get_u8(),
                    interval_time: buf.get_u8(),
                    recovery_time: buf.get_u8(),
                    program_row: buf.get_u8(),
                    program_column: buf.get_u8(),
                }))
            }
            MessageType::UserProfile => {
                check_length(ty, payload, 6)?;
                let mut buf = &payload[2..];
                Ok(Self::UserProfile(UserProfile {
                    sex: SexType::from(payload[1]),
                    age: buf.get_u8(),
                    weight: buf.get_u16(),
                    height: buf.get_u8(),
                }))
            }
            MessageType::Program => {
                check_length(ty, payload, 3)?;
                let mut buf = &payload[1..];
                Ok(Self::Program {
                    program: Program::from(buf.get_u16()),
                })
            }
            MessageType::HeartRateType => {
                check_length(ty, payload, 3)?;
                Ok(Self::HeartRateType {
                    type1: payload[1],
                    type2: payload[2],
                })
            }
            MessageType::ErrorCode => {
                check_length(ty, payload, 2)?;
                Ok(Self::ErrorCode { code: payload[1] })
            }
            MessageType::Speed => {
                check_length(ty, payload, 2)?;
                Ok(Self::Speed { speed: payload[1] })
            }
            MessageType::Incline => {
                check_length(ty, payload, 2)?;
                Ok(Self::Incline {
                    incline: payload[1],
                })
            }
            MessageType::Level => {
                check_length(ty, payload, 2)?;
                Ok(Self::Level { level: payload[1] })
            }
            MessageType::Rpm => {
                check_length(ty, payload, 2)?;
                Ok(Self::Rpm { rpm: payload[1] })
            }
            MessageType::HeartRate => {
                check_length(ty, payload, 2)?;
                Ok(Self::HeartRate {
                    heart_rate: payload[1],
                })
            }
            MessageType::TargetHeartRate => {
                check_length(ty, payload, 2)?;
                Ok(Self::TargetHeartRate {
                    heart_rate: payload[1],
                })
            }
            MessageType::MaxSpeed => {
                check_length(ty, payload, 2)?;
                Ok(Self::MaxSpeed { speed: payload[1] })
            }
            MessageType::MaxIncline => {
                check_length(ty, payload, 2)?;
                Ok(Self::MaxIncline {
                    max_incline: payload[1],
                })
            }
            MessageType::MaxLevel => {
                check_length(ty, payload, 2)?;
                Ok(Self::MaxLevel { level: payload[1] })
            }
            MessageType::UserIncline => {
                check_length(ty, payload, 2)?;
                Ok(Self::UserIncline {
                    incline: payload[1],
                })
            }
            MessageType::UserLevel => {
                check_length(ty, payload, 2)?;
                Ok(Self::UserLevel { level: payload[1] })
            }
            MessageType::EndWorkout => {
                check_length(ty, payload, 10)?;
                let mut buf = &payload[1..];
                Ok(Self::EndWorkout(EndWorkout {
                    seconds: buf.get_u16(),
                    distance: buf.get_u16(),
                    calories: buf.get_u16(),
                    speed: buf.get_u8(),
                    heart_rate: buf.get_u8(),
                    incline: buf.get_u8(),
                }))
            }
            MessageType::ProgramGraphics => {
                check_length(ty, payload, 19)?;
                let mut graph = [0u8; 18];
                graph.copy_from_slice(&payload[1..]);
                Ok(Self::ProgramGraphics { graph })
            }
            MessageType::DeviceInfo => {
                check_length(ty, payload, 8)?;
                Ok(Self::DeviceInfo(DeviceInfo {
                    model: DeviceModel::from(payload[1]),
                    version: payload[2],
                    units: UnitsType::from(payload[3]),
                    max_speed: payload[4],
                    min_speed: payload[5],
                    incline_max: payload[6],
                    user_segment: payload[7],
                }))
            }
            MessageType::Command => {
                check_length(ty, payload, 2)?;
                Ok(Self::Command {
                    command: CommandType::from(payload[1]),
                })
            }
            MessageType::Unknown(tag) => Err(TreadmillError::UnknownType {
                tag,
                payload: to_hex(payload),
            }),
        }
    }

    /// Serialize this message into an unwrapped payload, tag byte first
    #[must_use]
    pub fn encode_payload(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(self.expected_length());
        buf.put_u8(u8::from(self.message_type()));

        match self {
            Self::Ack { acknowledged } => {
                buf.put_u8(u8::from(*acknowledged));
                buf.put_slice(&ACK_TRAILER);
            }
            Self::SetWorkoutMode { mode } | Self::WorkoutMode { mode } => {
                buf.put_u8(u8::from(*mode));
            }
            Self::WorkoutTarget { time, calories } => {
                buf.put_u8(*time);
                buf.put_u8(0);
                buf.put_u16(*calories);
            }
            Self::WorkoutData(data) => {
                buf.put_u8(data.minute);
                buf.put_u8(data.second);
                buf.put_u16(data.distance);
                buf.put_u16(data.calories);
                buf.put_u8(data.heart_rate);
                buf.put_u8(data.speed);
                buf.put_u8(data.incline);
                buf.put_u8(data.hr_type);
                buf.put_u8(data.interval_time);
                buf.put_u8(data.recovery_time);
                buf.put_u8(data.program_row);
                buf.put_u8(data.program_column);
            }
            Self::UserProfile(profile) => {
                buf.put_u8(u8::from(profile.sex));
                buf.put_u8(profile.age);
                buf.put_u16(profile.weight);
                buf.put_u8(profile.height);
            }
            Self::Program { program } => {
                buf.put_u16(u16::from(*program));
            }
            Self::HeartRateType { type1, type2 } => {
                buf.put_u8(*type1);
                buf.put_u8(*type2);
            }
            Self::ErrorCode { code } => buf.put_u8(*code),
            Self::Speed { speed } | Self::MaxSpeed { speed } => buf.put_u8(*speed),
            Self::Incline { incline } | Self::UserIncline { incline } => buf.put_u8(*incline),
            Self::Level { level } | Self::MaxLevel { level } | Self::UserLevel { level } => {
                buf.put_u8(*level);
            }
            Self::Rpm { rpm } => buf.put_u8(*rpm),
            Self::HeartRate { heart_rate } | Self::TargetHeartRate { heart_rate } => {
                buf.put_u8(*heart_rate);
            }
            Self::MaxIncline { max_incline } => buf.put_u8(*max_incline),
            Self::EndWorkout(end) => {
                buf.put_u16(end.seconds);
                buf.put_u16(end.distance);
                buf.put_u16(end.calories);
                buf.put_u8(end.speed);
                buf.put_u8(end.heart_rate);
                buf.put_u8(end.incline);
            }
            Self::ProgramGraphics { graph } => buf.put_slice(graph),
            Self::GetDeviceInfo => {}
            Self::DeviceInfo(info) => {
                buf.put_u8(u8::from(info.model));
                buf.put_u8(info.version);
                buf.put_u8(u8::from(info.units));
                buf.put_u8(info.max_speed);
                buf.put_u8(info.min_speed);
                buf.put_u8(info.incline_max);
                buf.put_u8(info.user_segment);
            }
            Self::Command { command } => buf.put_u8(u8::from(*command)),
        }

        buf.to_vec()
    }
}

fn check_length(ty: MessageType, payload: &[u8], expected: usize) -> Result<()> {
    if payload.len() != expected {
        return Err(TreadmillError::InvalidMessage(format!(
            "expected {expected} bytes for {ty}, got {}: {}",
            payload.len(),
            to_hex(payload)
        )));
    }

    Ok(())
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ack { acknowledged } => write!(f, "ACK[Acknowledged={acknowledged}]"),
            Self::SetWorkoutMode { mode } => write!(f, "SetWorkoutMode[Mode={mode}]"),
            Self::WorkoutMode { mode } => write!(f, "WorkoutMode[Mode={mode}]"),
            Self::WorkoutTarget { time, calories } => {
                write!(f, "WorkoutTarget[Time={time},Calories={calories}]")
            }
            Self::WorkoutData(d) => write!(
                f,
                "WorkoutData[Minute={},Second={},Distance={},Calories={},HeartRate={},\
                 Speed={},Incline={},HRType={},IntervalTime={},RecoveryTime={},\
                 ProgramRow={},ProgramColumn={}]",
                d.minute,
                d.second,
                d.distance,
                d.calories,
                d.heart_rate,
                d.speed,
                d.incline,
                d.hr_type,
                d.interval_time,
                d.recovery_time,
                d.program_row,
                d.program_column,
            ),
            Self::UserProfile(p) => write!(
                f,
                "UserProfile[Sex={},Age={},Weight={},Height={}]",
                p.sex, p.age, p.weight, p.height
            ),
            Self::Program { program } => write!(f, "Program[Program={program}]"),
            Self::HeartRateType { type1, type2 } => {
                write!(f, "HeartRateType[Type1={type1},Type2={type2}]")
            }
            Self::ErrorCode { code } => write!(f, "ErrorCode[Code={code}]"),
            Self::Speed { speed } => write!(f, "Speed[Speed={speed}]"),
            Self::Incline { incline } => write!(f, "Incline[Incline={incline}]"),
            Self::Level { level } => write!(f, "Level[Level={level}]"),
            Self::Rpm { rpm } => write!(f, "RPM[RPM={rpm}]"),
            Self::HeartRate { heart_rate } => write!(f, "HeartRate[HeartRate={heart_rate}]"),
            Self::TargetHeartRate { heart_rate } => {
                write!(f, "TargetHeartRate[HeartRate={heart_rate}]")
            }
            Self::MaxSpeed { speed } => write!(f, "MaxSpeed[Speed={speed}]"),
            Self::MaxIncline { max_incline } => write!(f, "MaxIncline[MaxIncline={max_incline}]"),
            Self::MaxLevel { level } => write!(f, "MaxLevel[Level={level}]"),
            Self::UserIncline { incline } => write!(f, "UserIncline[Incline={incline}]"),
            Self::UserLevel { level } => write!(f, "UserLevel[Level={level}]"),
            Self::EndWorkout(e) => write!(
                f,
                "EndWorkout[Seconds={},Distance={},Calories={},Speed={},HeartRate={},Incline={}]",
                e.seconds, e.distance, e.calories, e.speed, e.heart_rate, e.incline
            ),
            Self::ProgramGraphics { graph } => {
                write!(f, "ProgramGraphics[Graph=")?;
                for (idx, column) in graph.iter().enumerate() {
                    if idx > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{column}")?;
                }
                write!(f, "]")
            }
            Self::GetDeviceInfo => write!(f, "GetDeviceInfo"),
            Self::DeviceInfo(i) => write!(
                f,
                "DeviceInfo[Model={},Version={},Units={},MaxSpeed={},MinSpeed={},\
                 InclineMax={},UserSegment={}]",
                i.model, i.version, i.units, i.max_speed, i.min_speed, i.incline_max, i.user_segment
            ),
            Self::Command { command } => write!(f, "Command[Command={command}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_hex(hex: &str) -> Vec<u8> {
        assert!(hex.len() % 2 == 0);
        (0..hex.len())
            .step_by(2)
            .map(|idx| u8::from_str_radix(&hex[idx..idx + 2], 16).unwrap())
            .collect()
    }

    #[test]
    fn test_parse_device_info() {
        let msg = Message::parse(&from_hex("5b08f092000178050f125d")).unwrap();

        let Message::DeviceInfo(info) = msg else {
            panic!("expected DeviceInfo, got {msg}");
        };

        assert_eq!(info.model, DeviceModel::F80);
        assert_eq!(info.version, 0);
        assert_eq!(info.units, UnitsType::Imperial);
        assert_eq!(info.max_speed, 120);
        assert_eq!(info.min_speed, 5);
        assert_eq!(info.incline_max, 15);
        assert_eq!(info.user_segment, 18);

        // The response form re-encodes to the original capture.
        assert_eq!(
            Message::DeviceInfo(info).encode().unwrap(),
            from_hex("5b08f092000178050f125d")
        );
    }

    #[test]
    fn test_encode_device_info_request() {
        let encoded = Message::GetDeviceInfo.encode().unwrap();
        assert_eq!(encoded, from_hex("5b01f05d"));
    }

    #[test]
    fn test_workout_mode_round_trip() {
        let msg = Message::parse(&from_hex("5b0203015d")).unwrap();
        assert_eq!(
            msg,
            Message::WorkoutMode {
                mode: WorkoutMode::Idle
            }
        );
        assert_eq!(msg.encode().unwrap(), from_hex("5b0203015d"));
    }

    #[test]
    fn test_set_workout_mode_round_trip() {
        let msg = Message::parse(&from_hex("5b0202025d")).unwrap();
        assert_eq!(
            msg,
            Message::SetWorkoutMode {
                mode: WorkoutMode::Start
            }
        );
        assert_eq!(msg.encode().unwrap(), from_hex("5b0202025d"));
    }

    #[test]
    fn test_heart_rate_type_round_trip() {
        let msg = Message::parse(&from_hex("5b030901005d")).unwrap();
        assert_eq!(msg, Message::HeartRateType { type1: 1, type2: 0 });
        assert_eq!(msg.encode().unwrap(), from_hex("5b030901005d"));
    }

    #[test]
    fn test_ack_round_trip() {
        let msg = Message::parse(&from_hex("5b0400094f4b5d")).unwrap();
        assert_eq!(
            msg,
            Message::Ack {
                acknowledged: MessageType::HeartRateType
            }
        );
        assert_eq!(msg.encode().unwrap(), from_hex("5b0400094f4b5d"));
    }

    #[test]
    fn test_ack_rejects_bad_trailer() {
        // "OK" trailer replaced with "NO"
        let err = Message::parse(&from_hex("5b0400094e4f5d")).unwrap_err();
        assert!(matches!(err, TreadmillError::AckTrailer(_)), "{err}");

        // One matching trailer byte is not enough.
        let err = Message::parse(&from_hex("5b0400094f4c5d")).unwrap_err();
        assert!(matches!(err, TreadmillError::AckTrailer(_)), "{err}");

        let err = Message::parse(&from_hex("5b040009004b5d")).unwrap_err();
        assert!(matches!(err, TreadmillError::AckTrailer(_)), "{err}");
    }

    #[test]
    fn test_user_profile_round_trip() {
        let msg = Message::parse(&from_hex("5b06070123009b435d")).unwrap();
        assert_eq!(
            msg,
            Message::UserProfile(UserProfile {
                sex: SexType::Male,
                age: 35,
                weight: 155,
                height: 67,
            })
        );
        assert_eq!(msg.encode().unwrap(), from_hex("5b06070123009b435d"));
    }

    #[test]
    fn test_workout_target_round_trip() {
        let msg = Message::parse(&from_hex("5b05040a0000005d")).unwrap();
        assert_eq!(
            msg,
            Message::WorkoutTarget {
                time: 10,
                calories: 0
            }
        );
        assert_eq!(msg.encode().unwrap(), from_hex("5b05040a0000005d"));
    }

    #[test]
    fn test_max_incline_round_trip() {
        let msg = Message::parse(&from_hex("5b0222095d")).unwrap();
        assert_eq!(msg, Message::MaxIncline { max_incline: 9 });
        assert_eq!(msg.encode().unwrap(), from_hex("5b0222095d"));
    }

    #[test]
    fn test_program_graphics_round_trip() {
        let raw = from_hex("5b13400101010101010101010101010101010101015d");
        let msg = Message::parse(&raw).unwrap();
        assert_eq!(msg, Message::ProgramGraphics { graph: [1; 18] });
        assert_eq!(msg.encode().unwrap(), raw);
    }

    #[test]
    fn test_workout_data_round_trip() {
        let raw = from_hex("5b0f06093b0000000000050000000000015d");
        let msg = Message::parse(&raw).unwrap();
        assert_eq!(
            msg,
            Message::WorkoutData(WorkoutData {
                minute: 9,
                second: 0x3B,
                speed: 5,
                program_column: 1,
                ..WorkoutData::default()
            })
        );
        assert_eq!(msg.encode().unwrap(), raw);
    }

    #[test]
    fn test_command_round_trip() {
        let msg = Message::parse(&from_hex("5b02f1025d")).unwrap();
        assert_eq!(
            msg,
            Message::Command {
                command: CommandType::LevelUp
            }
        );
        assert_eq!(msg.encode().unwrap(), from_hex("5b02f1025d"));
    }

    #[test]
    fn test_program_round_trip() {
        let msg = Message::parse(&from_hex("5b030810015d")).unwrap();
        assert_eq!(
            msg,
            Message::Program {
                program: Program::Manual
            }
        );
        assert_eq!(msg.encode().unwrap(), from_hex("5b030810015d"));
    }

    #[test]
    fn test_end_workout_round_trip() {
        let msg = Message::EndWorkout(EndWorkout {
            seconds: 1800,
            distance: 512,
            calories: 263,
            speed: 8,
            heart_rate: 140,
            incline: 2,
        });
        let encoded = msg.encode().unwrap();
        assert_eq!(encoded.len(), 13);
        assert_eq!(Message::parse(&encoded).unwrap(), msg);
    }

    #[test]
    fn test_user_incline_and_user_level_stay_distinct() {
        // Tags 0x25 and 0x27 carry the same single-byte layout but must not
        // collapse into one variant, otherwise re-encoding changes the tag.
        let incline = Message::parse(&from_hex("5b0225045d")).unwrap();
        assert_eq!(incline, Message::UserIncline { incline: 4 });
        assert_eq!(incline.encode().unwrap(), from_hex("5b0225045d"));

        let level = Message::parse(&from_hex("5b0227045d")).unwrap();
        assert_eq!(level, Message::UserLevel { level: 4 });
        assert_eq!(level.encode().unwrap(), from_hex("5b0227045d"));
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let err = Message::parse(&from_hex("5b02ab015d")).unwrap_err();
        assert!(
            matches!(err, TreadmillError::UnknownType { tag: 0xAB, .. }),
            "{err}"
        );
    }

    #[test]
    fn test_length_mismatch_rejected() {
        // WorkoutMode payload padded to three bytes; envelope is consistent
        // so this must fail the per-variant length check, not framing.
        let err = Message::parse(&from_hex("5b030301005d")).unwrap_err();
        assert!(matches!(err, TreadmillError::InvalidMessage(_)), "{err}");
    }

    #[test]
    fn test_framing_violations_rejected() {
        for bad in ["5c0203015d", "5b0203015c", "5b0103015d", "5b035d"] {
            let err = Message::parse(&from_hex(bad)).unwrap_err();
            assert!(matches!(err, TreadmillError::Framing(_)), "{bad}: {err}");
        }
    }

    #[test]
    fn test_display_rendering() {
        let msg = Message::Command {
            command: CommandType::LevelUp,
        };
        assert_eq!(format!("{msg}"), "Command[Command=LevelUp]");

        let msg = Message::parse(&from_hex("5b08f092000178050f125d")).unwrap();
        assert_eq!(
            format!("{msg}"),
            "DeviceInfo[Model=F80,Version=0,Units=Imperial,MaxSpeed=120,MinSpeed=5,\
             InclineMax=15,UserSegment=18]"
        );
    }
}
