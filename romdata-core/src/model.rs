//! Generation-agnostic entities populated by the decoders and consumed by
//! the encoders.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::{RomDataError, Result};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Type {
    Normal,
    Fighting,
    Flying,
    Poison,
    Ground,
    Rock,
    Bird,
    Bug,
    Ghost,
    Steel,
    Curse,
    Fire,
    Water,
    Grass,
    Electric,
    Psychic,
    Ice,
    Dragon,
    Dark,
    Fairy,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ExpCurve {
    MediumFast,
    Erratic,
    Fluctuating,
    MediumSlow,
    Fast,
    Slow,
    SlightlyFast,
    SlightlySlow,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum MoveCategory {
    Physical,
    Special,
    Status,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum StatType {
    Attack,
    Defense,
    SpecialAttack,
    SpecialDefense,
    Speed,
    Accuracy,
    Evasion,
    All,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum StatChangeMoveType {
    None,
    NoDamageTarget,
    NoDamageUser,
    DamageTarget,
    DamageUser,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum StatusType {
    None,
    Paralyze,
    Sleep,
    Poison,
    ToxicPoison,
    Burn,
    Freeze,
    Confusion,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum StatusMoveType {
    None,
    NoDamage,
    Damage,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatChange {
    pub stat: StatType,
    pub stages: i8,
    pub percent_chance: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Move {
    pub id: u16,
    pub name: String,
    pub move_type: Type,
    pub category: MoveCategory,
    pub power: u8,
    /// Accuracy as a percentage (0-100).
    pub hit_ratio: f64,
    pub pp: u8,
    pub priority: i8,
    /// Raw effect index; authoritative for the derived fields below on
    /// flat-bank titles.
    pub effect_index: u16,
    /// Raw secondary-effect chance as a percentage; 0 is stored as-is.
    pub secondary_effect_chance: f64,
    pub stat_changes: Vec<StatChange>,
    pub stat_change_move_type: StatChangeMoveType,
    pub status_type: StatusType,
    pub status_move_type: StatusMoveType,
    pub status_percent_chance: f64,
    pub flinch_percent_chance: f64,
    /// Percentage of damage dealt taken back as recoil.
    pub recoil_percent: u8,
    /// Percentage of damage dealt restored to the user.
    pub absorb_percent: u8,
    pub is_trap_move: bool,
    pub is_charge_move: bool,
    pub is_recharge_move: bool,
}

impl Move {
    pub fn new(id: u16, name: String, move_type: Type) -> Self {
        Self {
            id,
            name,
            move_type,
            category: MoveCategory::Status,
            power: 0,
            hit_ratio: 0.0,
            pp: 0,
            priority: 0,
            effect_index: 0,
            secondary_effect_chance: 0.0,
            stat_changes: Vec::new(),
            stat_change_move_type: StatChangeMoveType::None,
            status_type: StatusType::None,
            status_move_type: StatusMoveType::None,
            status_percent_chance: 0.0,
            flinch_percent_chance: 0.0,
            recoil_percent: 0,
            absorb_percent: 0,
            is_trap_move: false,
            is_charge_move: false,
            is_recharge_move: false,
        }
    }
}

/// Evolution methods across both supported generations.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum EvolutionType {
    Happiness,
    HappinessDay,
    HappinessNight,
    Level,
    Trade,
    TradeItem,
    TradeSpecial,
    Stone,
    LevelAttackHigher,
    LevelAtkDefSame,
    LevelDefenseHigher,
    LevelLowPv,
    LevelHighPv,
    LevelCreateExtra,
    LevelIsExtra,
    LevelHighBeauty,
    StoneMaleOnly,
    StoneFemaleOnly,
    LevelItemDay,
    LevelItemNight,
    LevelWithMove,
    LevelWithOther,
    LevelMaleOnly,
    LevelFemaleOnly,
    LevelElectrifiedArea,
    LevelMossRock,
    LevelIcyRock,
    LevelUpsideDown,
    FairyAffection,
    LevelWithDark,
    LevelRain,
    LevelDay,
    LevelNight,
    LevelFemaleEspurr,
    Unused,
    LevelGame,
    LevelDayGame,
    LevelNightGame,
    LevelSnowy,
    LevelDusk,
    LevelNightUltra,
    StoneUltra,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evolution {
    pub from: u16,
    pub to: u16,
    pub method: EvolutionType,
    /// Method parameter: level, item, move, species or condition.
    pub extra_info: u16,
    pub level: u8,
    pub to_form: Option<u8>,
    /// False whenever the source species has more than one outgoing edge.
    pub carry_stats: bool,
}

/// Recomputes `carry_stats` for every edge of one species.
pub fn mark_split_evolutions(evolutions: &mut [Evolution]) {
    let carry = evolutions.len() == 1;
    for evo in evolutions {
        evo.carry_stats = carry;
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUpMove {
    pub level: u8,
    pub move_id: u16,
}

/// Held-item slots after collapsing: two equal on-disk slots become one
/// guaranteed item.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeldItems {
    pub guaranteed: u16,
    pub common: u16,
    pub rare: u16,
}

impl HeldItems {
    pub fn from_slots(common: u16, rare: u16) -> Self {
        if common == rare {
            HeldItems {
                guaranteed: common,
                common: 0,
                rare: 0,
            }
        } else {
            HeldItems {
                guaranteed: 0,
                common,
                rare,
            }
        }
    }

    pub fn to_slots(&self) -> (u16, u16) {
        if self.guaranteed > 0 {
            (self.guaranteed, self.guaranteed)
        } else {
            (self.common, self.rare)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Species {
    /// On-disk record index; alternate forms use their stat record index.
    pub id: u16,
    pub name: String,
    pub hp: u8,
    pub attack: u8,
    pub defense: u8,
    pub speed: u8,
    pub special_attack: u8,
    pub special_defense: u8,
    pub primary_type: Type,
    pub secondary_type: Option<Type>,
    pub catch_rate: u8,
    pub growth_curve: ExpCurve,
    pub abilities: [u16; 3],
    pub held_items: HeldItems,
    pub dark_grass_held_item: u16,
    /// Sprite / palette reference.
    pub icon_index: Option<u16>,
    pub evolutions: Vec<Evolution>,
    pub learnset: Vec<LevelUpMove>,
    /// Species record this alternate form belongs to; never owned.
    pub base_species: Option<u16>,
    pub form_number: u8,
    /// Form numbers of this species that share its record.
    pub cosmetic_forms: Vec<u8>,
}

impl Species {
    pub fn new(id: u16, name: String) -> Self {
        Self {
            id,
            name,
            hp: 0,
            attack: 0,
            defense: 0,
            speed: 0,
            special_attack: 0,
            special_defense: 0,
            primary_type: Type::Normal,
            secondary_type: None,
            catch_rate: 0,
            growth_curve: ExpCurve::MediumFast,
            abilities: [0; 3],
            held_items: HeldItems::default(),
            dark_grass_held_item: 0,
            icon_index: None,
            evolutions: Vec::new(),
            learnset: Vec::new(),
            base_species: None,
            form_number: 0,
            cosmetic_forms: Vec::new(),
        }
    }

    pub fn set_types(&mut self, primary: Type, secondary: Type) {
        self.primary_type = primary;
        self.secondary_type = if secondary == primary {
            None
        } else {
            Some(secondary)
        };
    }

    pub fn secondary_or_primary(&self) -> Type {
        self.secondary_type.unwrap_or(self.primary_type)
    }

    pub fn base_stat_total(&self) -> u32 {
        [
            self.hp,
            self.attack,
            self.defense,
            self.speed,
            self.special_attack,
            self.special_defense,
        ]
        .iter()
        .map(|&s| s as u32)
        .sum()
    }
}

/// Checks that every `base_species` reference resolves to a species that
/// has no base of its own, which keeps form chains acyclic and one level deep.
pub fn validate_form_chains(species: &[Species]) -> Result<()> {
    let by_id: HashMap<u16, &Species> = species.iter().map(|s| (s.id, s)).collect();
    for s in species {
        if let Some(base) = s.base_species {
            if base == s.id {
                return Err(RomDataError::Precondition(format!(
                    "species {} is its own base form",
                    s.id
                )));
            }
            match by_id.get(&base) {
                Some(root) if root.base_species.is_none() => {}
                Some(_) => {
                    return Err(RomDataError::Precondition(format!(
                        "species {} has base {} which is itself a form",
                        s.id, base
                    )))
                }
                None => {
                    return Err(RomDataError::Precondition(format!(
                        "species {} refers to missing base {}",
                        s.id, base
                    )))
                }
            }
        }
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encounter {
    pub species: u16,
    pub level: u8,
    pub max_level: u8,
    pub form: Option<u8>,
    /// Slot only appears when an ally is called in a chained (SOS) battle.
    pub sos: bool,
    pub sos_type: Option<u8>,
}

impl Encounter {
    pub fn at_level(species: u16, level: u8) -> Self {
        Self {
            species,
            level,
            max_level: level,
            form: None,
            sos: false,
            sos_type: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterArea {
    pub display_name: String,
    pub rate: u8,
    /// Byte offset of the owning table record.
    pub offset: usize,
    pub encounters: Vec<Encounter>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyFormat {
    pub held_items: bool,
    pub custom_moves: bool,
}

impl PartyFormat {
    pub fn from_poke_type(value: u8) -> Self {
        PartyFormat {
            custom_moves: value & 1 != 0,
            held_items: value & 2 != 0,
        }
    }

    pub fn poke_type(&self) -> u8 {
        (self.custom_moves as u8) | ((self.held_items as u8) << 1)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleType {
    Single,
    Double,
    Triple,
    Rotation,
    Multi,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainerPokemon {
    pub species: u16,
    pub level: u16,
    pub form: u8,
    pub held_item: u16,
    pub moves: [u16; 4],
    pub ivs: [u8; 6],
    pub evs: [u8; 6],
    pub nature: u8,
    pub ability_slot: u8,
    pub gender: u8,
}

impl TrainerPokemon {
    pub fn new(species: u16, level: u16) -> Self {
        Self {
            species,
            level,
            form: 0,
            held_item: 0,
            moves: [0; 4],
            ivs: [0; 6],
            evs: [0; 6],
            nature: 0,
            ability_slot: 0,
            gender: 0,
        }
    }

    pub fn has_custom_moves(&self) -> bool {
        self.moves.iter().any(|&m| m != 0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trainer {
    pub index: usize,
    pub trainer_class: u16,
    pub name: String,
    pub party: Vec<TrainerPokemon>,
    /// Format read from disk; widened on encode when the party needs it.
    pub format: PartyFormat,
    pub battle_type: BattleType,
    pub ai_level: u32,
}

impl Trainer {
    /// The format the party must be written with: the stored flags plus any
    /// held items or moves added since load.
    pub fn effective_format(&self) -> PartyFormat {
        PartyFormat {
            held_items: self.format.held_items || self.party.iter().any(|p| p.held_item != 0),
            custom_moves: self.format.custom_moves
                || self.party.iter().any(TrainerPokemon::has_custom_moves),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shop {
    pub name: String,
    pub items: Vec<u16>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngameTrade {
    pub requested_species: u16,
    pub given_species: u16,
    pub given_form: u8,
    pub nickname: String,
    pub ot_name: String,
    pub ot_id: u32,
    /// HP, Attack, Defense, Speed, Sp. Atk, Sp. Def.
    pub ivs: [u8; 6],
    pub held_item: u16,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum StringTable {
    Items,
    TrainerClasses,
    TrainerNames,
    Locations,
    Abilities,
}

/// Everything decoded from one ROM.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GameData {
    pub species: Vec<Species>,
    pub moves: Vec<Move>,
    pub trainers: Vec<Trainer>,
    pub encounters: Vec<EncounterArea>,
    pub shops: Vec<Shop>,
    pub trades: Vec<IngameTrade>,
    pub tm_moves: Vec<u16>,
    pub tutor_moves: Vec<u16>,
    pub strings: BTreeMap<StringTable, Vec<String>>,
}

impl GameData {
    pub fn species_by_id(&self, id: u16) -> Option<&Species> {
        self.species.iter().find(|s| s.id == id)
    }

    pub fn move_by_id(&self, id: u16) -> Option<&Move> {
        self.moves.iter().find(|m| m.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_types_collapse() {
        let mut s = Species::new(1, "TEST".to_string());
        s.set_types(Type::Grass, Type::Grass);
        assert_eq!(s.secondary_type, None);
        assert_eq!(s.secondary_or_primary(), Type::Grass);

        s.set_types(Type::Grass, Type::Poison);
        assert_eq!(s.secondary_type, Some(Type::Poison));
    }

    #[test]
    fn held_items_collapse_and_expand_for_every_pair() {
        for item in 0u16..=255 {
            let held = HeldItems::from_slots(item, item);
            assert_eq!(held.guaranteed, item);
            assert_eq!((held.common, held.rare), (0, 0));
            assert_eq!(held.to_slots(), (item, item));
        }

        let held = HeldItems::from_slots(0x20, 0x30);
        assert_eq!(held.guaranteed, 0);
        assert_eq!(held.to_slots(), (0x20, 0x30));
    }

    #[test]
    fn split_evolutions_do_not_carry_stats() {
        let evo = |to| Evolution {
            from: 133,
            to,
            method: EvolutionType::Stone,
            extra_info: 0,
            level: 0,
            to_form: None,
            carry_stats: true,
        };
        let mut evos = vec![evo(134), evo(135)];
        mark_split_evolutions(&mut evos);
        assert!(evos.iter().all(|e| !e.carry_stats));

        let mut single = vec![evo(134)];
        mark_split_evolutions(&mut single);
        assert!(single[0].carry_stats);
    }

    #[test]
    fn form_chains_must_be_rooted() {
        let mut base = Species::new(1, "BASE".to_string());
        let mut form = Species::new(900, "BASE".to_string());
        form.base_species = Some(1);
        form.form_number = 1;
        assert!(validate_form_chains(&[base.clone(), form.clone()]).is_ok());

        base.base_species = Some(900);
        assert!(validate_form_chains(&[base, form.clone()]).is_err());

        form.base_species = Some(5);
        assert!(validate_form_chains(&[form]).is_err());
    }

    #[test]
    fn effective_format_widens_for_new_moves() {
        let mut trainer = Trainer {
            index: 0,
            trainer_class: 1,
            name: "JOEY".to_string(),
            party: vec![TrainerPokemon::new(19, 4)],
            format: PartyFormat::default(),
            battle_type: BattleType::Single,
            ai_level: 0,
        };
        assert_eq!(trainer.effective_format().poke_type(), 0);
        trainer.party[0].moves = [33, 39, 0, 0];
        assert_eq!(trainer.effective_format().poke_type(), 1);
        trainer.party[0].held_item = 7;
        assert_eq!(trainer.effective_format().poke_type(), 3);
        assert_eq!(PartyFormat::from_poke_type(3), trainer.effective_format());
    }
}
