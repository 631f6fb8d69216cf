//! Script block: global variables, brains, lookup tables and running scripts.
//!
//! Two records change shape depending on a field read moments earlier: a
//! brain's trailer depends on its attach type, and a running script carries a
//! mission payload only when the top bit of its index is set.

use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use std::io::{self, Read, Write};

use super::binary::{decode_narrow, encode_narrow, ReadExt, Record, WriteExt};
use super::globals::GlobalStore;
use super::vars::VarBlock;
use super::SaveError;
use crate::platform::Platform;

/// Brains stored in every save
pub const BRAIN_COUNT: usize = 70;

/// Bit of a script index marking a mission script
pub const MISSION_FLAG: u16 = 0x8000;

/// Bytes of mission code stored with a mission script
pub const MISSION_CODE_LEN: usize = 69_000;

/// Local variables stored with a mission script
pub const MISSION_LOCALS_LEN: usize = 1024;

const MODEL_REPLACEMENT_COUNT: usize = 25;
const INVISIBLE_OBJECT_COUNT: usize = 20;
const SUPPRESSED_MODEL_COUNT: usize = 20;
const LOD_ASSIGNMENT_COUNT: usize = 10;
const SCRIPT_ASSIGNMENT_COUNT: usize = 8;

/// What a brain or script is attached to
///
/// Kept as the raw byte so unknown values survive a round trip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AttachType(pub i8);

impl AttachType {
    pub const PED: Self = Self(0);
    pub const OBJECT: Self = Self(1);
    pub const CODE_USE: Self = Self(3);
    pub const BROKEN_CODE_USE: Self = Self(4);
    pub const ATTRACTOR: Self = Self(5);
    pub const NOT_IN_USE: Self = Self(-1);

    /// Whether a brain with this attach type stores a script name
    pub fn has_script_name(self) -> bool {
        self == Self::CODE_USE || self == Self::ATTRACTOR
    }
}

/// Tail of a brain record, selected by its attach type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrainTrailer {
    Script {
        name: [u8; 8],
    },
    Entity {
        model_id: u16,
        activation_chance: u16,
        padding: [u8; 4],
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Brain {
    pub index: u16,
    pub attach_type: AttachType,
    pub group_id: u8,
    pub status: u32,
    pub radius: f32,
    pub trailer: BrainTrailer,
}

impl Brain {
    pub fn script_name(&self) -> Option<String> {
        match &self.trailer {
            BrainTrailer::Script { name } => Some(decode_narrow(name)),
            BrainTrailer::Entity { .. } => None,
        }
    }
}

impl Default for Brain {
    fn default() -> Self {
        Self {
            index: 0,
            attach_type: AttachType::PED,
            group_id: 0,
            status: 0,
            radius: 0.0,
            trailer: BrainTrailer::Entity {
                model_id: 0,
                activation_chance: 0,
                padding: [0; 4],
            },
        }
    }
}

impl Record for Brain {
    fn read_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        let index = reader.read_u16::<LE>()?;
        let attach_type = AttachType(reader.read_i8()?);
        let group_id = reader.read_u8()?;
        let status = reader.read_u32::<LE>()?;
        let radius = reader.read_f32::<LE>()?;

        let trailer = if attach_type.has_script_name() {
            BrainTrailer::Script {
                name: reader.read_array()?,
            }
        } else {
            BrainTrailer::Entity {
                model_id: reader.read_u16::<LE>()?,
                activation_chance: reader.read_u16::<LE>()?,
                padding: reader.read_array()?,
            }
        };

        Ok(Self {
            index,
            attach_type,
            group_id,
            status,
            radius,
            trailer,
        })
    }

    fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u16::<LE>(self.index)?;
        writer.write_i8(self.attach_type.0)?;
        writer.write_u8(self.group_id)?;
        writer.write_u32::<LE>(self.status)?;
        writer.write_f32::<LE>(self.radius)?;

        match &self.trailer {
            BrainTrailer::Script { name } => writer.write_all(name),
            BrainTrailer::Entity {
                model_id,
                activation_chance,
                padding,
            } => {
                writer.write_u16::<LE>(*model_id)?;
                writer.write_u16::<LE>(*activation_chance)?;
                writer.write_all(padding)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissionInfo {
    pub on_mission_flag_offset: u32,
    pub last_mission_time: u32,
}

impl Record for MissionInfo {
    fn read_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            on_mission_flag_offset: reader.read_u32::<LE>()?,
            last_mission_time: reader.read_u32::<LE>()?,
        })
    }

    fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LE>(self.on_mission_flag_offset)?;
        writer.write_u32::<LE>(self.last_mission_time)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelReplacement {
    pub kind: u32,
    pub handle: u32,
    pub new_model_id: i32,
    pub old_model_id: i32,
}

impl Record for ModelReplacement {
    fn read_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            kind: reader.read_u32::<LE>()?,
            handle: reader.read_u32::<LE>()?,
            new_model_id: reader.read_i32::<LE>()?,
            old_model_id: reader.read_i32::<LE>()?,
        })
    }

    fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LE>(self.kind)?;
        writer.write_u32::<LE>(self.handle)?;
        writer.write_i32::<LE>(self.new_model_id)?;
        writer.write_i32::<LE>(self.old_model_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvisibleObject {
    pub kind: u32,
    pub handle: u32,
}

impl Record for InvisibleObject {
    fn read_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            kind: reader.read_u32::<LE>()?,
            handle: reader.read_u32::<LE>()?,
        })
    }

    fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LE>(self.kind)?;
        writer.write_u32::<LE>(self.handle)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LodAssignment {
    pub object_handle: u32,
    pub lod_handle: u32,
}

impl Record for LodAssignment {
    fn read_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            object_handle: reader.read_u32::<LE>()?,
            lod_handle: reader.read_u32::<LE>()?,
        })
    }

    fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LE>(self.object_handle)?;
        writer.write_u32::<LE>(self.lod_handle)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptAssignment {
    pub actor_model_id: u32,
    pub script_name: [u8; 8],
    pub unknown: [u32; 2],
}

impl Record for ScriptAssignment {
    fn read_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            actor_model_id: reader.read_u32::<LE>()?,
            script_name: reader.read_array()?,
            unknown: reader.read_word_array()?,
        })
    }

    fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LE>(self.actor_model_id)?;
        writer.write_all(&self.script_name)?;
        writer.write_words(&self.unknown)
    }
}

/// Counters following the lookup tables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptValues {
    pub unknown: [u8; 2],
    pub main_scm_size: u32,
    pub largest_mission_size: u32,
    pub mission_count: u32,
    pub highest_local: u32,
    /// Number of script records that follow; the source of truth when reading
    pub running_script_count: u32,
}

impl Record for ScriptValues {
    fn read_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            unknown: reader.read_array()?,
            main_scm_size: reader.read_u32::<LE>()?,
            largest_mission_size: reader.read_u32::<LE>()?,
            mission_count: reader.read_u32::<LE>()?,
            highest_local: reader.read_u32::<LE>()?,
            running_script_count: reader.read_u32::<LE>()?,
        })
    }

    fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.unknown)?;
        writer.write_u32::<LE>(self.main_scm_size)?;
        writer.write_u32::<LE>(self.largest_mission_size)?;
        writer.write_u32::<LE>(self.mission_count)?;
        writer.write_u32::<LE>(self.highest_local)?;
        writer.write_u32::<LE>(self.running_script_count)
    }
}

/// Code and locals carried by a running mission script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionPayload {
    pub code: Vec<u8>,
    pub locals: Vec<u32>,
}

impl Record for MissionPayload {
    fn read_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            code: reader.read_bytes(MISSION_CODE_LEN)?,
            locals: reader.read_words(MISSION_LOCALS_LEN)?,
        })
    }

    fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.code)?;
        writer.write_words(&self.locals)
    }
}

impl MissionPayload {
    /// Whether the buffers have the exact on-disk sizes
    pub fn has_fixed_layout(&self) -> bool {
        self.code.len() == MISSION_CODE_LEN && self.locals.len() == MISSION_LOCALS_LEN
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionState {
    pub base_ip: u32,
    pub current_ip: u32,
    pub return_stack: [u32; 8],
    pub return_stack_depth: u16,
    pub padding: [u8; 2],
}

impl Record for ExecutionState {
    fn read_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            base_ip: reader.read_u32::<LE>()?,
            current_ip: reader.read_u32::<LE>()?,
            return_stack: reader.read_word_array()?,
            return_stack_depth: reader.read_u16::<LE>()?,
            padding: reader.read_array()?,
        })
    }

    fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LE>(self.base_ip)?;
        writer.write_u32::<LE>(self.current_ip)?;
        writer.write_words(&self.return_stack)?;
        writer.write_u16::<LE>(self.return_stack_depth)?;
        writer.write_all(&self.padding)
    }
}

/// Scheduling state of a running script
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptInfo {
    pub is_active: bool,
    pub condition_result: bool,
    pub uses_mission_cleanup: bool,
    pub is_external: bool,
    pub overrides_textbox: bool,
    pub attach_type: AttachType,
    pub unknown: [u8; 2],
    /// Game time at which the script wakes up
    pub activation_time: u32,
    pub condition_count: u16,
    pub invert_return: bool,
    pub game_over_check_active: bool,
    pub wanted_or_busted: bool,
    pub unknown2: [u8; 3],
    pub skip_scene_position: u32,
    pub is_mission: bool,
    pub padding: [u8; 3],
    /// Byte offset into the global store where this script's code starts
    pub relative_instruction_pointer: u32,
    pub relative_return_stack: [u32; 8],
}

impl Record for ScriptInfo {
    fn read_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            is_active: reader.read_bool()?,
            condition_result: reader.read_bool()?,
            uses_mission_cleanup: reader.read_bool()?,
            is_external: reader.read_bool()?,
            overrides_textbox: reader.read_bool()?,
            attach_type: AttachType(reader.read_i8()?),
            unknown: reader.read_array()?,
            activation_time: reader.read_u32::<LE>()?,
            condition_count: reader.read_u16::<LE>()?,
            invert_return: reader.read_bool()?,
            game_over_check_active: reader.read_bool()?,
            wanted_or_busted: reader.read_bool()?,
            unknown2: reader.read_array()?,
            skip_scene_position: reader.read_u32::<LE>()?,
            is_mission: reader.read_bool()?,
            padding: reader.read_array()?,
            relative_instruction_pointer: reader.read_u32::<LE>()?,
            relative_return_stack: reader.read_word_array()?,
        })
    }

    fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_bool(self.is_active)?;
        writer.write_bool(self.condition_result)?;
        writer.write_bool(self.uses_mission_cleanup)?;
        writer.write_bool(self.is_external)?;
        writer.write_bool(self.overrides_textbox)?;
        writer.write_i8(self.attach_type.0)?;
        writer.write_all(&self.unknown)?;
        writer.write_u32::<LE>(self.activation_time)?;
        writer.write_u16::<LE>(self.condition_count)?;
        writer.write_bool(self.invert_return)?;
        writer.write_bool(self.game_over_check_active)?;
        writer.write_bool(self.wanted_or_busted)?;
        writer.write_all(&self.unknown2)?;
        writer.write_u32::<LE>(self.skip_scene_position)?;
        writer.write_bool(self.is_mission)?;
        writer.write_all(&self.padding)?;
        writer.write_u32::<LE>(self.relative_instruction_pointer)?;
        writer.write_words(&self.relative_return_stack)
    }
}

/// A running script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRecord {
    pub index: u16,
    /// Mobile saves only
    pub streamed_script_index: i32,
    /// Present exactly when the mission bit of `index` is set
    pub mission: Option<MissionPayload>,
    /// Linked-list pointers from the game's memory; never followed
    pub next: u32,
    pub previous: u32,
    pub name: [u8; 8],
    pub execution: ExecutionState,
    pub locals: Vec<u32>,
    pub timers: [u32; 2],
    pub info: ScriptInfo,
}

impl ScriptRecord {
    /// An inactive, zeroed script laid out for `platform`
    pub fn new(platform: &Platform, name: &str) -> Self {
        Self {
            index: 0,
            streamed_script_index: -1,
            mission: None,
            next: 0,
            previous: 0,
            name: encode_narrow(name),
            execution: ExecutionState::default(),
            locals: vec![0; platform.max_locals()],
            timers: [0; 2],
            info: ScriptInfo::default(),
        }
    }

    pub fn name(&self) -> String {
        decode_narrow(&self.name)
    }

    /// Replace the name, truncating to eight bytes
    pub fn set_name(&mut self, name: &str) {
        self.name = encode_narrow(name);
    }

    pub fn is_mission(&self) -> bool {
        self.index & MISSION_FLAG != 0
    }

    pub fn read<R: Read + ?Sized>(platform: &Platform, reader: &mut R) -> Result<Self, SaveError> {
        let index = reader.read_u16::<LE>()?;
        let streamed_script_index = if platform.is_mobile {
            reader.read_i32::<LE>()?
        } else {
            -1
        };

        let mission = if index & MISSION_FLAG != 0 {
            Some(MissionPayload::read_from(reader)?)
        } else {
            None
        };

        Ok(Self {
            index,
            streamed_script_index,
            mission,
            next: reader.read_u32::<LE>()?,
            previous: reader.read_u32::<LE>()?,
            name: reader.read_array()?,
            execution: ExecutionState::read_from(reader)?,
            locals: reader.read_words(platform.max_locals())?,
            timers: reader.read_word_array()?,
            info: ScriptInfo::read_from(reader)?,
        })
    }

    pub fn write<W: Write + ?Sized>(
        &self,
        platform: &Platform,
        writer: &mut W,
    ) -> Result<(), SaveError> {
        if self.locals.len() != platform.max_locals() {
            return Err(SaveError::LayoutMismatch {
                field: "script locals",
                platform: platform.name(),
            });
        }

        writer.write_u16::<LE>(self.index)?;
        if platform.is_mobile {
            writer.write_i32::<LE>(self.streamed_script_index)?;
        }

        match (&self.mission, self.is_mission()) {
            (Some(payload), true) if payload.has_fixed_layout() => payload.write_to(writer)?,
            (None, false) => {}
            _ => {
                return Err(SaveError::LayoutMismatch {
                    field: "mission payload",
                    platform: platform.name(),
                })
            }
        }

        writer.write_u32::<LE>(self.next)?;
        writer.write_u32::<LE>(self.previous)?;
        writer.write_all(&self.name)?;
        self.execution.write_to(writer)?;
        writer.write_words(&self.locals)?;
        writer.write_words(&self.timers)?;
        self.info.write_to(writer)?;
        Ok(())
    }
}

/// The script block
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptBlock {
    pub tag: [u8; 5],
    pub globals: GlobalStore,
    pub brains: Vec<Brain>,
    pub mission_info: MissionInfo,
    pub model_replacements: Vec<ModelReplacement>,
    pub invisible_objects: Vec<InvisibleObject>,
    pub suppressed_models: Vec<u32>,
    pub lod_assignments: Vec<LodAssignment>,
    pub script_assignments: Vec<ScriptAssignment>,
    pub values: ScriptValues,
    /// Present only in mobile saves
    pub save_state_type: Option<u32>,
    pub scripts: Vec<ScriptRecord>,
}

impl ScriptBlock {
    /// An empty block with a zeroed store of `store_words` words
    pub fn empty(platform: &Platform, store_words: usize) -> Self {
        Self {
            tag: *super::BLOCK_TAG,
            globals: GlobalStore::zeroed(store_words),
            brains: vec![Brain::default(); BRAIN_COUNT],
            mission_info: MissionInfo::default(),
            model_replacements: vec![ModelReplacement::default(); MODEL_REPLACEMENT_COUNT],
            invisible_objects: vec![InvisibleObject::default(); INVISIBLE_OBJECT_COUNT],
            suppressed_models: vec![0; SUPPRESSED_MODEL_COUNT],
            lod_assignments: vec![LodAssignment::default(); LOD_ASSIGNMENT_COUNT],
            script_assignments: vec![ScriptAssignment::default(); SCRIPT_ASSIGNMENT_COUNT],
            values: ScriptValues::default(),
            save_state_type: platform.is_mobile.then_some(0),
            scripts: Vec::new(),
        }
    }

    pub fn read<R: Read + ?Sized>(platform: &Platform, reader: &mut R) -> Result<Self, SaveError> {
        let tag = reader.read_array()?;
        let globals = GlobalStore::read(reader)?;
        let brains = reader.read_records(BRAIN_COUNT)?;
        let mission_info = MissionInfo::read_from(reader)?;
        let model_replacements = reader.read_records(MODEL_REPLACEMENT_COUNT)?;
        let invisible_objects = reader.read_records(INVISIBLE_OBJECT_COUNT)?;
        let suppressed_models = reader.read_words(SUPPRESSED_MODEL_COUNT)?;
        let lod_assignments = reader.read_records(LOD_ASSIGNMENT_COUNT)?;
        let script_assignments = reader.read_records(SCRIPT_ASSIGNMENT_COUNT)?;
        let values = ScriptValues::read_from(reader)?;

        let save_state_type = if platform.is_mobile {
            Some(reader.read_u32::<LE>()?)
        } else {
            None
        };

        let scripts = (0..values.running_script_count)
            .map(|_| ScriptRecord::read(platform, reader))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            store_bytes = globals.size(),
            scripts = scripts.len(),
            "read script block"
        );

        Ok(Self {
            tag,
            globals,
            brains,
            mission_info,
            model_replacements,
            invisible_objects,
            suppressed_models,
            lod_assignments,
            script_assignments,
            values,
            save_state_type,
            scripts,
        })
    }

    pub fn write<W: Write + ?Sized>(
        &self,
        platform: &Platform,
        writer: &mut W,
    ) -> Result<(), SaveError> {
        if self.scripts.len() != self.values.running_script_count as usize {
            return Err(SaveError::ScriptCountMismatch {
                declared: self.values.running_script_count,
                actual: self.scripts.len(),
            });
        }

        writer.write_all(&self.tag)?;
        self.globals.write(writer)?;
        write_table(writer, platform, "brains", &self.brains, BRAIN_COUNT)?;
        self.mission_info.write_to(writer)?;
        write_table(
            writer,
            platform,
            "model replacements",
            &self.model_replacements,
            MODEL_REPLACEMENT_COUNT,
        )?;
        write_table(
            writer,
            platform,
            "invisible objects",
            &self.invisible_objects,
            INVISIBLE_OBJECT_COUNT,
        )?;
        if self.suppressed_models.len() != SUPPRESSED_MODEL_COUNT {
            return Err(SaveError::LayoutMismatch {
                field: "suppressed models",
                platform: platform.name(),
            });
        }
        writer.write_words(&self.suppressed_models)?;
        write_table(
            writer,
            platform,
            "LOD assignments",
            &self.lod_assignments,
            LOD_ASSIGNMENT_COUNT,
        )?;
        write_table(
            writer,
            platform,
            "script assignments",
            &self.script_assignments,
            SCRIPT_ASSIGNMENT_COUNT,
        )?;
        self.values.write_to(writer)?;

        match (self.save_state_type, platform.is_mobile) {
            (Some(state), true) => writer.write_u32::<LE>(state)?,
            (None, false) => {}
            _ => {
                return Err(SaveError::LayoutMismatch {
                    field: "save state type",
                    platform: platform.name(),
                })
            }
        }

        for script in &self.scripts {
            script.write(platform, writer)?;
        }

        Ok(())
    }

    /// Copy `code` into the global store at byte `position` and start a new
    /// script there
    ///
    /// The script is activated at the current game time so it runs as soon as
    /// the save is loaded.
    pub fn embed(
        &mut self,
        platform: &Platform,
        vars: &VarBlock,
        name: &str,
        code: &[u8],
        position: u32,
    ) -> Result<&ScriptRecord, SaveError> {
        self.globals.write_code(position, code)?;

        let mut script = ScriptRecord::new(platform, name);
        script.info.is_active = true;
        script.info.attach_type = AttachType::NOT_IN_USE;
        script.info.relative_instruction_pointer = position;
        script.info.activation_time = vars.time_in_milliseconds();

        tracing::info!(
            name = %script.name(),
            position,
            len = code.len(),
            activation_time = script.info.activation_time,
            "embedded script"
        );

        self.scripts.push(script);
        self.values.running_script_count += 1;

        let index = self.scripts.len() - 1;
        Ok(&self.scripts[index])
    }
}

fn write_table<W: Write + ?Sized, T: Record>(
    writer: &mut W,
    platform: &Platform,
    field: &'static str,
    records: &[T],
    count: usize,
) -> Result<(), SaveError> {
    if records.len() != count {
        return Err(SaveError::LayoutMismatch {
            field,
            platform: platform.name(),
        });
    }
    writer.write_records(records)?;
    Ok(())
}
