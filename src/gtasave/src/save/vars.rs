//! Variables block: global game state.
//!
//! The block is a fixed sequence of small structures. Two things vary by
//! platform: the width of the "last mission passed" text (two bytes per unit
//! on mobile and PS2-Japan, one byte elsewhere) and the trailer after the
//! cinematic camera flags.

use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use std::io::{self, Read, Write};

use super::binary::{ReadExt, Record, WriteExt};
use super::SaveError;
use crate::platform::{Platform, PlatformKind};

/// Units in the "last mission passed" slot
pub const MISSION_NAME_UNITS: usize = 100;

/// Text of the last mission passed, kept as its raw slot units
///
/// Narrow platforms store one byte per unit; those bytes are kept widened so
/// that both widths share one representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionName {
    units: [u16; MISSION_NAME_UNITS],
}

impl MissionName {
    pub fn new(text: &str) -> Self {
        let mut name = Self::default();
        name.set(text);
        name
    }

    /// Text up to the first null unit
    pub fn text(&self) -> String {
        let end = self
            .units
            .iter()
            .position(|&u| u == 0)
            .unwrap_or(MISSION_NAME_UNITS);
        String::from_utf16_lossy(&self.units[..end])
    }

    /// Replace the text, zero-padding the rest of the slot
    ///
    /// The last unit is always left null.
    pub fn set(&mut self, text: &str) {
        self.units = [0; MISSION_NAME_UNITS];
        let slots = &mut self.units[..MISSION_NAME_UNITS - 1];
        for (dst, src) in slots.iter_mut().zip(text.encode_utf16()) {
            *dst = src;
        }
    }

    fn read<R: Read + ?Sized>(reader: &mut R, wide: bool) -> io::Result<Self> {
        let mut units = [0u16; MISSION_NAME_UNITS];
        if wide {
            reader.read_u16_into::<LE>(&mut units)?;
        } else {
            let bytes: [u8; MISSION_NAME_UNITS] = reader.read_array()?;
            for (dst, src) in units.iter_mut().zip(bytes) {
                *dst = u16::from(src);
            }
        }
        Ok(Self { units })
    }

    fn write<W: Write + ?Sized>(
        &self,
        writer: &mut W,
        platform: &Platform,
    ) -> Result<(), SaveError> {
        if platform.is_wide_char {
            for &unit in &self.units {
                writer.write_u16::<LE>(unit)?;
            }
            return Ok(());
        }

        // Narrow slots hold Latin-1 only.
        let mut bytes = [0u8; MISSION_NAME_UNITS];
        for (dst, &unit) in bytes.iter_mut().zip(&self.units) {
            *dst = u8::try_from(unit).map_err(|_| SaveError::LayoutMismatch {
                field: "last mission passed",
                platform: platform.name(),
            })?;
        }
        writer.write_all(&bytes)?;
        Ok(())
    }
}

impl Default for MissionName {
    fn default() -> Self {
        Self {
            units: [0; MISSION_NAME_UNITS],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub version: u32,
    pub last_mission_passed: MissionName,
    pub mission_pack_game: bool,
    pub padding: [u8; 3],
}

impl Metadata {
    fn read<R: Read + ?Sized>(reader: &mut R, platform: &Platform) -> io::Result<Self> {
        Ok(Self {
            version: reader.read_u32::<LE>()?,
            last_mission_passed: MissionName::read(reader, platform.is_wide_char)?,
            mission_pack_game: reader.read_bool()?,
            padding: reader.read_array()?,
        })
    }

    fn write<W: Write + ?Sized>(
        &self,
        writer: &mut W,
        platform: &Platform,
    ) -> Result<(), SaveError> {
        writer.write_u32::<LE>(self.version)?;
        self.last_mission_passed.write(writer, platform)?;
        writer.write_bool(self.mission_pack_game)?;
        writer.write_all(&self.padding)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Position {
    pub current_island: u32,
    pub camera_position: [f32; 3],
}

impl Record for Position {
    fn read_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        let current_island = reader.read_u32::<LE>()?;
        let mut camera_position = [0f32; 3];
        reader.read_f32_into::<LE>(&mut camera_position)?;
        Ok(Self {
            current_island,
            camera_position,
        })
    }

    fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LE>(self.current_island)?;
        for &axis in &self.camera_position {
            writer.write_f32::<LE>(axis)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GameTime {
    pub month: u8,
    pub day_of_month: u8,
    pub hour: u8,
    pub minute: u8,
}

impl Record for GameTime {
    fn read_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        let [month, day_of_month, hour, minute] = reader.read_array()?;
        Ok(Self {
            month,
            day_of_month,
            hour,
            minute,
        })
    }

    fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&[self.month, self.day_of_month, self.hour, self.minute])
    }
}

/// In-game clock
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clock {
    pub ms_per_game_minute: u32,
    pub last_clock_tick: u32,
    pub game_clock: GameTime,
    pub weekday: u8,
    pub stored_game_clock: GameTime,
    pub clock_has_been_stored: bool,
}

impl Record for Clock {
    fn read_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            ms_per_game_minute: reader.read_u32::<LE>()?,
            last_clock_tick: reader.read_u32::<LE>()?,
            game_clock: GameTime::read_from(reader)?,
            weekday: reader.read_u8()?,
            stored_game_clock: GameTime::read_from(reader)?,
            clock_has_been_stored: reader.read_bool()?,
        })
    }

    fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LE>(self.ms_per_game_minute)?;
        writer.write_u32::<LE>(self.last_clock_tick)?;
        self.game_clock.write_to(writer)?;
        writer.write_u8(self.weekday)?;
        self.stored_game_clock.write_to(writer)?;
        writer.write_bool(self.clock_has_been_stored)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerSettings {
    pub pad_mode: u16,
    pub has_player_cheated: bool,
    pub padding: [u8; 3],
}

impl Record for PlayerSettings {
    fn read_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            pad_mode: reader.read_u16::<LE>()?,
            has_player_cheated: reader.read_bool()?,
            padding: reader.read_array()?,
        })
    }

    fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u16::<LE>(self.pad_mode)?;
        writer.write_bool(self.has_player_cheated)?;
        writer.write_all(&self.padding)
    }
}

/// Mapping between real time and game time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeMapping {
    pub time_in_milliseconds: u32,
    pub time_scale: f32,
    pub time_step: f32,
    pub time_step_non_clipped: f32,
    pub frame_counter: u32,
}

impl Record for TimeMapping {
    fn read_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            time_in_milliseconds: reader.read_u32::<LE>()?,
            time_scale: reader.read_f32::<LE>()?,
            time_step: reader.read_f32::<LE>()?,
            time_step_non_clipped: reader.read_f32::<LE>()?,
            frame_counter: reader.read_u32::<LE>()?,
        })
    }

    fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LE>(self.time_in_milliseconds)?;
        writer.write_f32::<LE>(self.time_scale)?;
        writer.write_f32::<LE>(self.time_step)?;
        writer.write_f32::<LE>(self.time_step_non_clipped)?;
        writer.write_u32::<LE>(self.frame_counter)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Weather {
    pub old_weather_type: u16,
    pub new_weather_type: u16,
    pub forced_weather_type: u16,
    pub padding: [u8; 2],
    pub interpolation: f32,
    pub weather_type_in_list: u32,
    pub rain: f32,
}

impl Record for Weather {
    fn read_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            old_weather_type: reader.read_u16::<LE>()?,
            new_weather_type: reader.read_u16::<LE>()?,
            forced_weather_type: reader.read_u16::<LE>()?,
            padding: reader.read_array()?,
            interpolation: reader.read_f32::<LE>()?,
            weather_type_in_list: reader.read_u32::<LE>()?,
            rain: reader.read_f32::<LE>()?,
        })
    }

    fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u16::<LE>(self.old_weather_type)?;
        writer.write_u16::<LE>(self.new_weather_type)?;
        writer.write_u16::<LE>(self.forced_weather_type)?;
        writer.write_all(&self.padding)?;
        writer.write_f32::<LE>(self.interpolation)?;
        writer.write_u32::<LE>(self.weather_type_in_list)?;
        writer.write_f32::<LE>(self.rain)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Camera {
    pub vehicle: u32,
    pub character: u32,
}

impl Record for Camera {
    fn read_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            vehicle: reader.read_u32::<LE>()?,
            character: reader.read_u32::<LE>()?,
        })
    }

    fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LE>(self.vehicle)?;
        writer.write_u32::<LE>(self.character)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtraColor {
    pub color: u32,
    pub enabled: bool,
    pub padding: [u8; 3],
    pub interpolation: f32,
    pub weather_type: u32,
}

impl Record for ExtraColor {
    fn read_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            color: reader.read_u32::<LE>()?,
            enabled: reader.read_bool()?,
            padding: reader.read_array()?,
            interpolation: reader.read_f32::<LE>()?,
            weather_type: reader.read_u32::<LE>()?,
        })
    }

    fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LE>(self.color)?;
        writer.write_bool(self.enabled)?;
        writer.write_all(&self.padding)?;
        writer.write_f32::<LE>(self.interpolation)?;
        writer.write_u32::<LE>(self.weather_type)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Surroundings {
    pub current_area: u32,
    pub invert_look: bool,
    pub padding: [u8; 3],
    pub extra_color: ExtraColor,
    pub water_configuration: u32,
}

impl Record for Surroundings {
    fn read_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            current_area: reader.read_u32::<LE>()?,
            invert_look: reader.read_bool()?,
            padding: reader.read_array()?,
            extra_color: ExtraColor::read_from(reader)?,
            water_configuration: reader.read_u32::<LE>()?,
        })
    }

    fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LE>(self.current_area)?;
        writer.write_bool(self.invert_look)?;
        writer.write_all(&self.padding)?;
        self.extra_color.write_to(writer)?;
        writer.write_u32::<LE>(self.water_configuration)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Riots {
    pub active: bool,
    pub police_cars_disabled: bool,
    pub padding: [u8; 2],
}

impl Record for Riots {
    fn read_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            active: reader.read_bool()?,
            police_cars_disabled: reader.read_bool()?,
            padding: reader.read_array()?,
        })
    }

    fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_bool(self.active)?;
        writer.write_bool(self.police_cars_disabled)?;
        writer.write_all(&self.padding)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WantedLevel {
    pub maximum: u32,
    pub maximum_chaos: u32,
}

impl Record for WantedLevel {
    fn read_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            maximum: reader.read_u32::<LE>()?,
            maximum_chaos: reader.read_u32::<LE>()?,
        })
    }

    fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LE>(self.maximum)?;
        writer.write_u32::<LE>(self.maximum_chaos)
    }
}

/// Regional build flags
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Audience {
    pub french_game: bool,
    pub german_game: bool,
    pub uncensored: bool,
    pub padding: u8,
}

impl Record for Audience {
    fn read_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            french_game: reader.read_bool()?,
            german_game: reader.read_bool()?,
            uncensored: reader.read_bool()?,
            padding: reader.read_u8()?,
        })
    }

    fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_bool(self.french_game)?;
        writer.write_bool(self.german_game)?;
        writer.write_bool(self.uncensored)?;
        writer.write_u8(self.padding)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CinematicCamera {
    pub should_be_here: u8,
    pub remaining_help_shows: u8,
}

impl Record for CinematicCamera {
    fn read_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        let [should_be_here, remaining_help_shows] = reader.read_array()?;
        Ok(Self {
            should_be_here,
            remaining_help_shows,
        })
    }

    fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&[self.should_be_here, self.remaining_help_shows])
    }
}

/// Windows `SYSTEMTIME`, only present in desktop saves
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemTime {
    pub year: u16,
    pub month: u16,
    pub day_of_week: u16,
    pub day: u16,
    pub hour: u16,
    pub minute: u16,
    pub second: u16,
    pub millisecond: u16,
}

impl Record for SystemTime {
    fn read_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        let mut fields = [0u16; 8];
        reader.read_u16_into::<LE>(&mut fields)?;
        let [year, month, day_of_week, day, hour, minute, second, millisecond] = fields;
        Ok(Self {
            year,
            month,
            day_of_week,
            day,
            hour,
            minute,
            second,
            millisecond,
        })
    }

    fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        for field in [
            self.year,
            self.month,
            self.day_of_week,
            self.day,
            self.hour,
            self.minute,
            self.second,
            self.millisecond,
        ] {
            writer.write_u16::<LE>(field)?;
        }
        Ok(())
    }
}

/// Platform-specific bytes following the cinematic camera flags
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformTrailer {
    Desktop {
        system_time: SystemTime,
        unknown: [u8; 2],
    },
    Mobile([u8; 30]),
    Playstation([u8; 34]),
}

impl PlatformTrailer {
    pub fn empty(platform: &Platform) -> Self {
        match platform.kind() {
            PlatformKind::Pc => PlatformTrailer::Desktop {
                system_time: SystemTime::default(),
                unknown: [0; 2],
            },
            PlatformKind::Mobile => PlatformTrailer::Mobile([0; 30]),
            PlatformKind::Ps2 => PlatformTrailer::Playstation([0; 34]),
        }
    }

    fn read<R: Read + ?Sized>(reader: &mut R, platform: &Platform) -> io::Result<Self> {
        Ok(match platform.kind() {
            PlatformKind::Pc => PlatformTrailer::Desktop {
                system_time: SystemTime::read_from(reader)?,
                unknown: reader.read_array()?,
            },
            PlatformKind::Mobile => PlatformTrailer::Mobile(reader.read_array()?),
            PlatformKind::Ps2 => PlatformTrailer::Playstation(reader.read_array()?),
        })
    }

    fn write<W: Write + ?Sized>(
        &self,
        writer: &mut W,
        platform: &Platform,
    ) -> Result<(), SaveError> {
        match (self, platform.kind()) {
            (
                PlatformTrailer::Desktop {
                    system_time,
                    unknown,
                },
                PlatformKind::Pc,
            ) => {
                system_time.write_to(writer)?;
                writer.write_all(unknown)?;
            }
            (PlatformTrailer::Mobile(bytes), PlatformKind::Mobile) => writer.write_all(bytes)?,
            (PlatformTrailer::Playstation(bytes), PlatformKind::Ps2) => writer.write_all(bytes)?,
            _ => {
                return Err(SaveError::LayoutMismatch {
                    field: "platform trailer",
                    platform: platform.name(),
                })
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gui {
    pub target_marker_handle: u32,
    pub car_steal_help_shown: bool,
}

impl Record for Gui {
    fn read_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            target_marker_handle: reader.read_u32::<LE>()?,
            car_steal_help_shown: reader.read_bool()?,
        })
    }

    fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LE>(self.target_marker_handle)?;
        writer.write_bool(self.car_steal_help_shown)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cheats {
    pub taxis_have_nitro: bool,
    pub prostitutes_pay_you: bool,
    pub padding: u8,
}

impl Record for Cheats {
    fn read_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            taxis_have_nitro: reader.read_bool()?,
            prostitutes_pay_you: reader.read_bool()?,
            padding: reader.read_u8()?,
        })
    }

    fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_bool(self.taxis_have_nitro)?;
        writer.write_bool(self.prostitutes_pay_you)?;
        writer.write_u8(self.padding)
    }
}

/// The variables block
#[derive(Debug, Clone, PartialEq)]
pub struct VarBlock {
    pub tag: [u8; 5],
    pub metadata: Metadata,
    pub position: Position,
    pub clock: Clock,
    pub player: PlayerSettings,
    pub time_mapping: TimeMapping,
    pub weather: Weather,
    pub camera: Camera,
    pub surroundings: Surroundings,
    pub riots: Riots,
    pub wanted_level: WantedLevel,
    pub audience: Audience,
    pub reserved: [u32; 11],
    pub cinematic_camera: CinematicCamera,
    pub trailer: PlatformTrailer,
    pub gui: Gui,
    pub cheats: Cheats,
    /// Present only in mobile saves
    pub mobile_trailer: Option<[u8; 4]>,
}

impl VarBlock {
    /// A zeroed block laid out for `platform`
    pub fn empty(platform: &Platform) -> Self {
        Self {
            tag: *super::BLOCK_TAG,
            metadata: Metadata::default(),
            position: Position::default(),
            clock: Clock::default(),
            player: PlayerSettings::default(),
            time_mapping: TimeMapping::default(),
            weather: Weather::default(),
            camera: Camera::default(),
            surroundings: Surroundings::default(),
            riots: Riots::default(),
            wanted_level: WantedLevel::default(),
            audience: Audience::default(),
            reserved: [0; 11],
            cinematic_camera: CinematicCamera::default(),
            trailer: PlatformTrailer::empty(platform),
            gui: Gui::default(),
            cheats: Cheats::default(),
            mobile_trailer: platform.is_mobile.then_some([0; 4]),
        }
    }

    /// Encoded size of the block, tag included
    pub fn encoded_len(platform: &Platform) -> usize {
        let mission_name = if platform.is_wide_char {
            MISSION_NAME_UNITS * 2
        } else {
            MISSION_NAME_UNITS
        };
        let trailer = match platform.kind() {
            PlatformKind::Pc => 18,
            PlatformKind::Mobile => 30,
            PlatformKind::Ps2 => 34,
        };
        let mobile_trailer = if platform.is_mobile { 4 } else { 0 };

        // Everything else is the same on every platform.
        5 + 4 + mission_name + 4 + 186 + trailer + mobile_trailer
    }

    pub fn read<R: Read + ?Sized>(platform: &Platform, reader: &mut R) -> Result<Self, SaveError> {
        let block = Self {
            tag: reader.read_array()?,
            metadata: Metadata::read(reader, platform)?,
            position: Position::read_from(reader)?,
            clock: Clock::read_from(reader)?,
            player: PlayerSettings::read_from(reader)?,
            time_mapping: TimeMapping::read_from(reader)?,
            weather: Weather::read_from(reader)?,
            camera: Camera::read_from(reader)?,
            surroundings: Surroundings::read_from(reader)?,
            riots: Riots::read_from(reader)?,
            wanted_level: WantedLevel::read_from(reader)?,
            audience: Audience::read_from(reader)?,
            reserved: reader.read_word_array()?,
            cinematic_camera: CinematicCamera::read_from(reader)?,
            trailer: PlatformTrailer::read(reader, platform)?,
            gui: Gui::read_from(reader)?,
            cheats: Cheats::read_from(reader)?,
            mobile_trailer: if platform.is_mobile {
                Some(reader.read_array()?)
            } else {
                None
            },
        };

        tracing::debug!(
            version = block.metadata.version,
            last_mission = %block.last_mission_passed(),
            "read variables block"
        );
        Ok(block)
    }

    pub fn write<W: Write + ?Sized>(
        &self,
        platform: &Platform,
        writer: &mut W,
    ) -> Result<(), SaveError> {
        writer.write_all(&self.tag)?;
        self.metadata.write(writer, platform)?;
        self.position.write_to(writer)?;
        self.clock.write_to(writer)?;
        self.player.write_to(writer)?;
        self.time_mapping.write_to(writer)?;
        self.weather.write_to(writer)?;
        self.camera.write_to(writer)?;
        self.surroundings.write_to(writer)?;
        self.riots.write_to(writer)?;
        self.wanted_level.write_to(writer)?;
        self.audience.write_to(writer)?;
        writer.write_words(&self.reserved)?;
        self.cinematic_camera.write_to(writer)?;
        self.trailer.write(writer, platform)?;
        self.gui.write_to(writer)?;
        self.cheats.write_to(writer)?;

        match (self.mobile_trailer, platform.is_mobile) {
            (Some(bytes), true) => writer.write_all(&bytes)?,
            (None, false) => {}
            _ => {
                return Err(SaveError::LayoutMismatch {
                    field: "mobile trailer",
                    platform: platform.name(),
                })
            }
        }

        Ok(())
    }

    pub fn last_mission_passed(&self) -> String {
        self.metadata.last_mission_passed.text()
    }

    pub fn set_last_mission_passed(&mut self, text: &str) {
        self.metadata.last_mission_passed.set(text);
    }

    /// Game time in milliseconds; scripts activated at this time start at once
    pub fn time_in_milliseconds(&self) -> u32 {
        self.time_mapping.time_in_milliseconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const ALL_PLATFORMS: [Platform; 4] = [
        Platform::pc(),
        Platform::mobile(),
        Platform::ps2(),
        Platform::ps2_japan(),
    ];

    fn sample_block(platform: &Platform) -> VarBlock {
        let mut block = VarBlock::empty(platform);
        block.metadata.version = 0x35_01_00_00;
        block.set_last_mission_passed("Big Smoke");
        block.position.camera_position = [2495.5, -1686.25, 13.5];
        block.clock.game_clock = GameTime {
            month: 4,
            day_of_month: 12,
            hour: 21,
            minute: 7,
        };
        block.time_mapping.time_in_milliseconds = 1_234_567;
        block.time_mapping.time_scale = 1.0;
        block.weather.rain = 0.25;
        block.audience.uncensored = true;
        block.reserved[3] = 0xDEAD_BEEF;
        block.gui.car_steal_help_shown = true;
        block
    }

    fn encode(block: &VarBlock, platform: &Platform) -> Vec<u8> {
        let mut out = Vec::new();
        block.write(platform, &mut out).unwrap();
        out
    }

    #[test]
    fn test_encoded_len_constants() {
        assert_eq!(VarBlock::encoded_len(&Platform::pc()), 317);
        assert_eq!(VarBlock::encoded_len(&Platform::ps2()), 333);
        assert_eq!(VarBlock::encoded_len(&Platform::ps2_japan()), 433);
        assert_eq!(VarBlock::encoded_len(&Platform::mobile()), 433);
    }

    #[test]
    fn test_written_len_matches_constant() {
        for platform in ALL_PLATFORMS {
            let bytes = encode(&sample_block(&platform), &platform);
            assert_eq!(
                bytes.len(),
                VarBlock::encoded_len(&platform),
                "{}",
                platform
            );
        }
    }

    #[test]
    fn test_roundtrip_all_platforms() {
        for platform in ALL_PLATFORMS {
            let original = sample_block(&platform);
            let bytes = encode(&original, &platform);

            let decoded = VarBlock::read(&platform, &mut Cursor::new(&bytes)).unwrap();
            assert_eq!(decoded, original, "{}", platform);
            assert_eq!(encode(&decoded, &platform), bytes, "{}", platform);
        }
    }

    #[test]
    fn test_opaque_bytes_survive_roundtrip() {
        let platform = Platform::pc();
        let mut bytes = encode(&sample_block(&platform), &platform);

        // Garbage after the mission name terminator and inside the reserved
        // buffer must come back unchanged.
        bytes[9 + 20] = b'X';
        bytes[245..289]
            .iter_mut()
            .enumerate()
            .for_each(|(i, b)| *b = i as u8);

        let decoded = VarBlock::read(&platform, &mut Cursor::new(&bytes)).unwrap();
        assert_eq!(decoded.last_mission_passed(), "Big Smoke");
        assert_eq!(encode(&decoded, &platform), bytes);
    }

    #[test]
    fn test_wide_mission_name_layout() {
        let platform = Platform::mobile();
        let bytes = encode(&sample_block(&platform), &platform);
        // Tag (5) + version (4), then UTF-16LE units.
        assert_eq!(&bytes[9..13], &[b'B', 0, b'i', 0]);
        assert_eq!(&bytes[9 + 18..9 + 20], &[0, 0]);
    }

    #[test]
    fn test_narrow_mission_name_layout() {
        let platform = Platform::pc();
        let bytes = encode(&sample_block(&platform), &platform);
        assert_eq!(&bytes[9..18], b"Big Smoke");
        assert!(bytes[18..109].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_mission_name_truncated_at_null() {
        let mut name = MissionName::new("Sweet");
        assert_eq!(name.text(), "Sweet");
        name.set("");
        assert_eq!(name.text(), "");
        let long = "x".repeat(150);
        name.set(&long);
        assert_eq!(name.text().len(), MISSION_NAME_UNITS - 1);
        assert_eq!(name.units[MISSION_NAME_UNITS - 1], 0);
    }

    #[test]
    fn test_long_mission_name_keeps_terminator() {
        let platform = Platform::pc();
        let mut block = sample_block(&platform);
        block.set_last_mission_passed(&"x".repeat(150));

        let bytes = encode(&block, &platform);
        assert_eq!(bytes[9 + 98], b'x');
        assert_eq!(bytes[9 + 99], 0);

        let decoded = VarBlock::read(&platform, &mut Cursor::new(&bytes)).unwrap();
        assert_eq!(decoded.last_mission_passed(), "x".repeat(99));
    }

    #[test]
    fn test_narrow_mission_name_rejects_wide_text() {
        let platform = Platform::pc();
        let mut block = sample_block(&platform);
        block.set_last_mission_passed("\u{3A9}mega");

        let mut out = Vec::new();
        assert!(matches!(
            block.write(&platform, &mut out),
            Err(SaveError::LayoutMismatch {
                field: "last mission passed",
                ..
            })
        ));

        // Latin-1 still fits a narrow slot
        block.set_last_mission_passed("Caf\u{E9}");
        let bytes = encode(&block, &platform);
        assert_eq!(bytes[12], 0xE9);

        // wide platforms keep the full unit
        let wide = Platform::mobile();
        let mut block = sample_block(&wide);
        block.set_last_mission_passed("\u{3A9}mega");
        let bytes = encode(&block, &wide);
        let decoded = VarBlock::read(&wide, &mut Cursor::new(&bytes)).unwrap();
        assert_eq!(decoded.last_mission_passed(), "\u{3A9}mega");
    }

    #[test]
    fn test_short_read_is_io_error() {
        let platform = Platform::pc();
        let bytes = encode(&sample_block(&platform), &platform);
        let result = VarBlock::read(&platform, &mut Cursor::new(&bytes[..200]));
        assert!(matches!(result, Err(SaveError::Io(_))));
    }

    #[test]
    fn test_trailer_must_match_platform() {
        let block = sample_block(&Platform::pc());
        let mut out = Vec::new();
        let result = block.write(&Platform::ps2(), &mut out);
        assert!(matches!(result, Err(SaveError::LayoutMismatch { .. })));
    }
}
