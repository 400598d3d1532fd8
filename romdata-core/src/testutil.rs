//! Synthetic images shared by the handler tests.

use std::fs;
use std::path::Path;

use crate::catalog::{Catalog, RomEntry};
use crate::charmap;
use crate::container::garc::{Archive, GarcVersion};
use crate::container::{lz11, mini};
use crate::gen7::text::encode_file as encode_text;
use crate::image::RomImage;

pub const GEN2_TEST_CATALOG: &str = "
[Test Crystal]
Generation=2
Game=BYTE
Version=0
NonJapanese=1
Type=Crystal
PokemonCount=4
PokemonNamesOffset=0x4000
PokemonNamesLength=10
PokemonStatsOffset=0x4100
MoveCount=4
MoveNamesOffset=0x4200
MoveDataOffset=0x4300
ItemCount=3
ItemNamesOffset=0x4400
TMMovesOffset=0x4500
TMCount=2
HMCount=1
MoveTutorMovesOffset=0x4510
MoveTutorCount=3
TrainerClassNamesOffset=0x4600
PokemonMovesetsTableOffset=0x8000
TrainerDataTableOffset=0xC000
TrainerClassAmount=2
TrainerDataClassCounts=[2, 1]
WildPokemonOffset=0x10000
MapHeaders=0x14000
MapGroupSizes=[2]
LandmarkTableOffset=0x14100
LandmarkCount=3
ShopPointersOffset=0x18000
ShopCount=2
TradeTableOffset=0x1C000
TradeTableSize=1
TradeNameLength=11
TradeOTLength=11
FreeSpaceFill=0x00
";

pub const GEN2_BACKGROUND: u8 = 0xAA;

pub fn gen2_entry() -> RomEntry {
    let catalog = Catalog::parse(GEN2_TEST_CATALOG).unwrap();
    catalog.entries()[0].clone()
}

fn text(s: &str) -> Vec<u8> {
    let mut bytes = charmap::encode(s);
    bytes.push(charmap::TERMINATOR);
    bytes
}

fn fixed_text(s: &str, len: usize) -> Vec<u8> {
    let mut bytes = charmap::encode(s);
    bytes.resize(len, charmap::TERMINATOR);
    bytes
}

/// Offsets of the variable-length records inside [`gen2_rom_bytes`].
pub const GEN2_MOVESETS: [usize; 4] = [0x8010, 0x8020, 0x8030, 0x8040];
pub const GEN2_TRAINER_CLASSES: [usize; 2] = [0xC010, 0xC040];
pub const GEN2_SHOPS: [usize; 2] = [0x18010, 0x18020];

/// Eight-bank cartridge with a tiny catalogued layout. Each bank that holds
/// relocatable records also has a 0x100-byte run of free space at +0x1000.
pub fn gen2_rom_bytes() -> Vec<u8> {
    fn put(image: &mut RomImage, offset: usize, bytes: &[u8]) {
        image.write_bytes(offset, bytes).unwrap();
    }

    let mut image = RomImage::new(vec![GEN2_BACKGROUND; 8 * 0x4000]);

    // header
    put(&mut image, 0x134, b"PM_CRYSTAL\0");
    put(&mut image, 0x13F, b"BYTE");
    put(&mut image, 0x14A, &[0x01]);
    put(&mut image, 0x14C, &[0x00]);

    // species names and base stats
    for (i, name) in ["BULBASAUR", "IVYSAUR", "CHARMANDER", "PIDGEY"].iter().enumerate() {
        put(&mut image, 0x4000 + i * 10, &fixed_text(name, 10));
    }
    let stats: [([u8; 6], [u8; 2], u8, [u8; 2]); 4] = [
        ([45, 49, 49, 45, 65, 65], [0x16, 0x03], 45, [0x10, 0x11]),
        ([60, 62, 63, 60, 80, 80], [0x16, 0x16], 45, [0x20, 0x20]),
        ([39, 52, 43, 65, 60, 50], [0x14, 0x14], 45, [0x00, 0x00]),
        ([40, 45, 40, 56, 35, 35], [0x00, 0x02], 255, [0x00, 0x00]),
    ];
    for (i, (base, types, catch_rate, items)) in stats.iter().enumerate() {
        let mut rec = [0x33u8; 0x20];
        rec[0] = (i + 1) as u8;
        rec[1..7].copy_from_slice(base);
        rec[7..9].copy_from_slice(types);
        rec[9] = *catch_rate;
        rec[11..13].copy_from_slice(items);
        rec[22] = 3;
        put(&mut image, 0x4100 + i * 0x20, &rec);
    }

    // moves
    let mut names = Vec::new();
    for name in ["POUND", "KARATE CHOP", "THUNDER WAVE", "EMBER"] {
        names.extend(text(name));
    }
    put(&mut image, 0x4200, &names);
    let moves: [[u8; 7]; 4] = [
        [0x01, 0x00, 40, 0x00, 0xFF, 35, 0x00],
        [0x02, 0x00, 50, 0x01, 0xFF, 25, 0x00],
        [0x03, 0x43, 0, 0x17, 0xFF, 20, 0x00],
        [0x04, 0x04, 40, 0x14, 0xFF, 25, 0x19],
    ];
    for (i, rec) in moves.iter().enumerate() {
        put(&mut image, 0x4300 + i * 7, rec);
    }

    // items, TMs, tutors, trainer class names
    let mut items = Vec::new();
    for name in ["MASTER BALL", "ULTRA BALL", "BRIGHTPOWDER"] {
        items.extend(text(name));
    }
    put(&mut image, 0x4400, &items);
    put(&mut image, 0x4500, &[1, 3, 2]);
    put(&mut image, 0x4510, &[4, 3, 2]);
    let mut classes = text("LEADER");
    classes.extend(text("YOUNGSTER"));
    put(&mut image, 0x4600, &classes);

    // evolutions and learnsets
    let movesets: [&[u8]; 4] = [
        &[1, 16, 2, 0, 1, 1, 4, 2, 0],
        &[0, 1, 1, 0],
        &[3, 0xFF, 4, 4, 2, 4, 0, 1, 3, 0],
        &[5, 20, 1, 1, 2, 0x50, 3, 0, 1, 4, 9, 4, 0],
    ];
    for (i, rec) in movesets.iter().enumerate() {
        image.write_pointer(0x8000 + i * 2, GEN2_MOVESETS[i]).unwrap();
        put(&mut image, GEN2_MOVESETS[i], rec);
    }
    put(&mut image, 0x9000, &[0u8; 0x100]);

    // trainers
    let mut class1 = text("FALKNER");
    class1.extend_from_slice(&[0x00, 7, 4, 9, 4, 0xFF]);
    class1.extend(text("JOE"));
    class1.extend_from_slice(&[0x02, 5, 1, 0x10, 0xFF]);
    let mut class2 = text("JOEY");
    class2.extend_from_slice(&[0x01, 4, 3, 1, 2, 3, 4, 0xFF]);
    image.write_pointer(0xC000, GEN2_TRAINER_CLASSES[0]).unwrap();
    image.write_pointer(0xC002, GEN2_TRAINER_CLASSES[1]).unwrap();
    put(&mut image, GEN2_TRAINER_CLASSES[0], &class1);
    put(&mut image, GEN2_TRAINER_CLASSES[1], &class2);
    put(&mut image, 0xD000, &[0u8; 0x100]);

    // wild encounters: johto grass, johto water, kanto grass, kanto water,
    // swarm grass, swarm water
    let mut wild = vec![1, 1, 10, 20, 30];
    for time in 0..3u8 {
        for slot in 0..7u8 {
            wild.extend_from_slice(&[2 + slot, time + 1]);
        }
    }
    wild.push(0xFF);
    wild.extend_from_slice(&[1, 2, 5, 20, 4, 15, 4, 25, 4, 0xFF]);
    wild.push(0xFF);
    wild.push(0xFF);
    wild.extend_from_slice(&[1, 2, 1, 1, 1]);
    for _ in 0..21 {
        wild.extend_from_slice(&[10, 4]);
    }
    wild.push(0xFF);
    wild.push(0xFF);
    put(&mut image, 0x10000, &wild);

    // map headers and landmarks
    image.write_pointer(0x14000, 0x14010).unwrap();
    put(&mut image, 0x14010, &[0x25, 1, 2, 0x10, 0x40, 1, 5, 6, 7]);
    put(&mut image, 0x14019, &[0x25, 1, 2, 0x10, 0x40, 2, 5, 6, 7]);
    let landmark_names = [(0x14200, "SPECIAL"), (0x14210, "NEW BARK"), (0x14220, "ROUTE 29")];
    for (i, (at, name)) in landmark_names.iter().enumerate() {
        put(&mut image, 0x14100 + i * 4, &[0x10 + i as u8, 0x20]);
        image.write_pointer(0x14102 + i * 4, *at).unwrap();
        put(&mut image, *at, &text(name));
    }
    put(&mut image, 0x15000, &[0u8; 0x100]);

    // shops
    image.write_pointer(0x18000, GEN2_SHOPS[0]).unwrap();
    image.write_pointer(0x18002, GEN2_SHOPS[1]).unwrap();
    put(&mut image, GEN2_SHOPS[0], &[2, 0x12, 0x13, 0xFF]);
    put(&mut image, GEN2_SHOPS[1], &[1, 0x14, 0xFF]);
    put(&mut image, 0x19000, &[0u8; 0x100]);

    // in-game trade
    let mut trade = vec![0x00, 1, 4];
    trade.extend(fixed_text("MUSCLE", 11));
    trade.extend_from_slice(&[0x37, 0x66, 0x20, 0x92, 0x54]);
    trade.extend(fixed_text("MIKE", 11));
    trade.extend_from_slice(&[0x00, 0x00]);
    put(&mut image, 0x1C000, &trade);

    image.into_bytes()
}

pub const GEN7_TEST_CATALOG: &str = "
[Test Sun]
Generation=7
Game=CTR-P-TEST
TitleId=0x00040000001FFF00
Type=SM
PokemonCount=3
MoveCount=3
PersonalGarc=a/0/1/7
EvolutionsGarc=a/0/1/4
LearnsetsGarc=a/0/1/3
MoveDataGarc=a/0/1/1
TextStringsGarc=a/0/3/2
WildPokemonGarc=a/0/8/2
TrainerDataGarc=a/1/0/5
TrainerPokemonGarc=a/1/0/6
InGameTradesGarc=a/1/5/5
PokemonIconsGarc=a/0/9/3
IconWidth=16
IconHeight=8
PokemonNamesTextIndex=0
MoveNamesTextIndex=1
ItemNamesTextIndex=2
AbilityNamesTextIndex=3
TrainerNamesTextIndex=4
TrainerClassNamesTextIndex=5
MapNamesTextIndex=6
TradeStringsTextIndex=7
ShopCro=Shop.cro
ShopItemsOffset=0x10
ShopItemSizes=[2, 1]
CosmeticForms=[3]
TimeOfDayEncounters=true
TutorMovesOffset=0x20
TutorMoveCount=3
";

pub fn gen7_entry() -> RomEntry {
    let catalog = Catalog::parse(GEN7_TEST_CATALOG).unwrap();
    catalog.entries()[0].clone()
}

fn archive(files: Vec<Vec<u8>>) -> Archive {
    let mut archive = Archive::new(GarcVersion::V6);
    for file in files {
        archive.push_file(file);
    }
    archive
}

fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn gen7_species_names() -> Vec<String> {
    lines(&["Egg", "Rowlet", "Litten", "Popplio"])
}

/// Personal files 0..=6: three species, Rowlet's full form at 4 and
/// Popplio's cosmetic forms at 5 and 6.
pub fn gen7_personal_archive() -> Archive {
    struct Personal {
        stats: [u8; 6],
        types: [u8; 2],
        items: [u16; 3],
        abilities: [u8; 3],
        form_stats: u16,
        form_count: u8,
    }
    let record = |p: Personal| {
        let mut rec = vec![0u8; 0x54];
        rec[0..6].copy_from_slice(&p.stats);
        rec[6..8].copy_from_slice(&p.types);
        rec[8] = 45;
        for (i, item) in p.items.iter().enumerate() {
            rec[0x0C + i * 2..0x0E + i * 2].copy_from_slice(&item.to_le_bytes());
        }
        rec[0x15] = 3;
        rec[0x18..0x1B].copy_from_slice(&p.abilities);
        rec[0x1C..0x1E].copy_from_slice(&p.form_stats.to_le_bytes());
        rec[0x20] = p.form_count;
        rec
    };
    let popplio = |form_stats| Personal {
        stats: [50, 54, 54, 40, 66, 56],
        types: [10, 10],
        items: [0, 0, 0],
        abilities: [67, 67, 104],
        form_stats,
        form_count: 3,
    };

    archive(vec![
        vec![0u8; 0x54],
        record(Personal {
            stats: [68, 55, 55, 42, 50, 50],
            types: [11, 2],
            items: [0, 0, 0],
            abilities: [65, 65, 203],
            form_stats: 4,
            form_count: 2,
        }),
        record(Personal {
            stats: [45, 65, 40, 70, 60, 40],
            types: [9, 9],
            items: [0x10, 0x10, 0x22],
            abilities: [66, 66, 22],
            form_stats: 0,
            form_count: 1,
        }),
        record(popplio(5)),
        record(Personal {
            stats: [78, 75, 75, 52, 70, 70],
            types: [7, 2],
            items: [0, 0, 0],
            abilities: [65, 65, 203],
            form_stats: 4,
            form_count: 2,
        }),
        record(popplio(5)),
        record(popplio(5)),
    ])
}

/// Evolution and learnset files for personal indices 0..=4. Rowlet
/// levels into Litten at 17.
pub fn gen7_evolution_archives() -> (Archive, Archive) {
    let mut evolutions = vec![vec![0u8; 0x40]; 5];
    evolutions[1][0..8].copy_from_slice(&[4, 0, 0, 0, 2, 0, 0xFF, 17]);

    let learnset = |pairs: &[(u16, u16)]| {
        let mut out = Vec::new();
        for (move_id, level) in pairs {
            out.extend_from_slice(&move_id.to_le_bytes());
            out.extend_from_slice(&level.to_le_bytes());
        }
        out.extend_from_slice(&[0xFF; 4]);
        out
    };
    let learnsets = vec![
        learnset(&[]),
        learnset(&[(1, 1), (3, 6)]),
        learnset(&[(2, 1)]),
        learnset(&[(1, 1), (3, 9)]),
        learnset(&[(1, 1)]),
    ];
    (archive(evolutions), archive(learnsets))
}

pub fn gen7_move_names() -> Vec<String> {
    lines(&["-----", "Tackle", "Nuzzle", "Growl"])
}

/// A "WD" container with the empty move plus Tackle, Nuzzle and Growl.
pub fn gen7_move_archive() -> Archive {
    let record = |fields: &[(usize, u8)]| {
        let mut rec = vec![0u8; 0x28];
        for &(at, value) in fields {
            rec[at] = value;
        }
        rec
    };
    let records = vec![
        vec![0u8; 0x28],
        // type, quality, category, power, accuracy, pp, target
        record(&[(0, 0), (1, 0), (2, 1), (3, 40), (4, 100), (5, 35), (0x14, 4)]),
        record(&[
            (0, 12),
            (1, 4),
            (2, 1),
            (3, 20),
            (4, 100),
            (5, 20),
            (8, 1),
            (0x14, 4),
        ]),
        record(&[
            (0, 0),
            (1, 2),
            (2, 0),
            (4, 100),
            (5, 40),
            (0x14, 4),
            (0x15, 1),
            (0x18, 0xFF),
        ]),
    ];
    archive(vec![mini::pack(&records, "WD")])
}

pub fn gen7_trainer_names() -> Vec<String> {
    lines(&["Ilima", "Hau"])
}

/// Trainer 0 has one plain member; trainer 1 (Hau) runs a double battle
/// with moves and held items.
pub fn gen7_trainer_archives() -> (Archive, Archive) {
    let trainer = |class: u8, battle: u8, count: u8, format: u8, ai: u32| {
        let mut rec = vec![0u8; 0x14];
        rec[0..4].copy_from_slice(&[class, battle, count, format]);
        rec[0x0C..0x10].copy_from_slice(&ai.to_le_bytes());
        rec
    };
    let member = |species: u16, level: u16, ivs: [u8; 6], item: u16, moves: [u16; 4]| {
        let mut rec = vec![0u8; 0x20];
        let packed = ivs
            .iter()
            .enumerate()
            .fold(0u32, |acc, (i, &iv)| acc | (iv as u32) << (5 * i));
        rec[0x08..0x0C].copy_from_slice(&packed.to_le_bytes());
        rec[0x0C..0x0E].copy_from_slice(&level.to_le_bytes());
        rec[0x0E..0x10].copy_from_slice(&species.to_le_bytes());
        rec[0x12..0x14].copy_from_slice(&item.to_le_bytes());
        for (i, m) in moves.iter().enumerate() {
            rec[0x14 + i * 2..0x16 + i * 2].copy_from_slice(&m.to_le_bytes());
        }
        rec
    };

    let mut hau = member(2, 5, [31, 30, 29, 28, 27, 26], 0x44, [1, 2, 3, 0]);
    hau[0] = (2 << 4) | 1;
    hau[1] = 7;
    hau[2..8].copy_from_slice(&[1, 2, 3, 4, 5, 6]);
    hau.extend(member(3, 6, [31; 6], 0, [3, 1, 0, 0]));

    let trdata = archive(vec![trainer(1, 0, 1, 0, 1), trainer(3, 1, 2, 3, 7)]);
    let trpoke = archive(vec![member(10, 3, [0; 6], 0, [0; 4]), hau]);
    (trdata, trpoke)
}

pub fn gen7_location_names() -> Vec<String> {
    lines(&["Mystery Zone", "Route 1"])
}

/// One island file with three zones (two tables, none, one) and a zone
/// data file that only describes the first two zones.
pub fn gen7_wild_archive() -> Archive {
    let table = |min: u8, max: u8, base: u16| {
        let mut t = vec![min, max];
        t.extend_from_slice(&[10; 10]);
        for i in 0..90u16 {
            let raw: u16 = match i {
                85 => 20 | (1 << 11),
                _ => base + i % 10,
            };
            t.extend_from_slice(&raw.to_le_bytes());
            t.extend_from_slice(&[0, 0]);
        }
        t
    };
    let mut route = table(2, 4, 10);
    route.extend(table(3, 5, 30));
    let streams = vec![route, Vec::new(), table(8, 9, 40)];

    let mut zones = vec![0u8; 2 * 0x54];
    zones[0x1C..0x1E].copy_from_slice(&1u16.to_le_bytes());
    archive(vec![mini::pack(&streams, "EA"), zones])
}

/// Shop module: two shops of two and one items at 0x10.
pub fn gen7_shop_cro() -> Vec<u8> {
    let mut cro = b"CRO0".to_vec();
    cro.resize(0x10, 0x5A);
    for item in [1u16, 2, 17] {
        cro.extend_from_slice(&item.to_le_bytes());
    }
    cro.resize(0x20, 0x5A);
    cro
}

pub fn gen7_trade_strings() -> Vec<String> {
    lines(&["Bubbles", "Sparkle", "Kiko", "Lani"])
}

pub fn gen7_trade_archive() -> Archive {
    let trade = |given: u16, form: u8, ivs: [u8; 6], ot_id: u32, item: u16, requested: u16| {
        let mut rec = vec![0u8; 0x34];
        rec[0..2].copy_from_slice(&given.to_le_bytes());
        rec[2] = form;
        rec[4..10].copy_from_slice(&ivs);
        rec[0x0C..0x10].copy_from_slice(&ot_id.to_le_bytes());
        rec[0x10..0x12].copy_from_slice(&item.to_le_bytes());
        rec[0x14..0x16].copy_from_slice(&requested.to_le_bytes());
        rec
    };
    let mut file = trade(3, 1, [31; 6], 0x0001_E240, 0, 2);
    file.extend(trade(2, 0, [20, 20, 20, 20, 20, 20], 54321, 0x99, 1));
    archive(vec![file])
}

/// Executable image with the tutor list [7, 8, 9] at 0x20.
pub fn gen7_code_bin() -> Vec<u8> {
    let mut code = vec![0x11u8; 0x20];
    for id in [7u16, 8, 9] {
        code.extend_from_slice(&id.to_le_bytes());
    }
    code.resize(0x40, 0x11);
    code
}

fn gen7_text_archive() -> Archive {
    let files: [&[&str]; 8] = [
        &["Egg", "Rowlet", "Litten", "Popplio"],
        &["-----", "Tackle", "Nuzzle", "Growl"],
        &["None", "Master Ball", "Ultra Ball"],
        &["-----", "Overgrow", "Blaze"],
        &["Ilima", "Hau"],
        &["Pokémon Trainer", "Youngster", "Lass", "Rival"],
        &["Mystery Zone", "Route 1"],
        &["Bubbles", "Sparkle", "Kiko", "Lani"],
    ];
    archive(files.iter().map(|f| encode_text(&lines(f))).collect())
}

fn gen7_icon_archive() -> Archive {
    let mut icon = Vec::new();
    for color in 0..16u16 {
        icon.extend_from_slice(&(color * 0x0421).to_le_bytes());
    }
    icon.extend(lz11::compress(&[0x21u8; 64]));
    archive(vec![icon.clone(), icon.clone(), icon])
}

/// Writes a complete extracted title below `root`.
pub fn write_gen7_layout(root: &Path) {
    let write = |rel: &str, bytes: Vec<u8>| {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
    };

    let (evolutions, learnsets) = gen7_evolution_archives();
    let (trdata, trpoke) = gen7_trainer_archives();
    let archives = [
        ("a/0/1/7", gen7_personal_archive()),
        ("a/0/1/4", evolutions),
        ("a/0/1/3", learnsets),
        ("a/0/1/1", gen7_move_archive()),
        ("a/0/3/2", gen7_text_archive()),
        ("a/0/8/2", gen7_wild_archive()),
        ("a/1/0/5", trdata),
        ("a/1/0/6", trpoke),
        ("a/1/5/5", gen7_trade_archive()),
        ("a/0/9/3", gen7_icon_archive()),
    ];
    for (rel, archive) in archives {
        write(&format!("romfs/{}", rel), archive.to_bytes());
    }
    write("romfs/Shop.cro", gen7_shop_cro());
    write("exefs/code.bin", gen7_code_bin());

    let mut exheader = vec![0u8; 0x400];
    exheader[0x200..0x208].copy_from_slice(&0x0004_0000_001F_FF00u64.to_le_bytes());
    write("exheader.bin", exheader);
    let mut ncch = vec![0u8; 0x200];
    ncch[0x150..0x15A].copy_from_slice(b"CTR-P-TEST");
    write("ncch_header.bin", ncch);
}
