use std::fs;

use indoc::indoc;
use osmpo::traits::Parser;
use osmpo::{
    Catalog, Document, ExportConfig, Extractor, ImportConfig, MergeSummary, RecordKind, RuleSet,
    formats::po, merge, merge_into,
};
use tempfile::tempdir;

const RULES: &str = indoc! {"
    - type: way
      match:
        has_tag: highway
      tags: name
    - type: any
      match:
        or:
          - has_tag: shop
          - has_tag: amenity
      tags: [name, description]
    - type: relation
      match:
        tag_equals: { key: type, value: boundary }
      tags: [name, official_name]
"};

const CITY: &str = indoc! {r#"
    <?xml version="1.0" encoding="UTF-8"?>
    <osm version="0.6" generator="osmpo-tests">
      <node id="100" lat="53.90" lon="27.56">
        <tag k="amenity" v="cafe"/>
        <tag k="name" v="Kava &amp; Knihi"/>
        <tag k="description" v="Books&#10;and coffee"/>
      </node>
      <node id="101" lat="53.91" lon="27.57"/>
      <way id="200">
        <nd ref="100"/>
        <nd ref="101"/>
        <tag k="highway" v="residential"/>
        <tag k="name" v="Lenina"/>
        <tag k="name:de" v="Leninstraße"/>
      </way>
      <way id="201">
        <tag k="building" v="yes"/>
        <tag k="name" v="Not a road"/>
      </way>
      <relation id="300">
        <member type="way" ref="200" role="outer"/>
        <tag k="type" v="boundary"/>
        <tag k="name" v="Minsk"/>
      </relation>
    </osm>
"#};

fn export(document: &Document, language: &str) -> String {
    let rules = RuleSet::from_yaml(RULES).unwrap();
    Extractor::new(&rules, ExportConfig::new(language)).extract_document(document)
}

#[test]
fn test_export_selects_translatable_tags() {
    let document = Document::parse(CITY).unwrap();
    let entries = po::parse(&export(&document, "de"));

    let references: Vec<String> = entries
        .iter()
        .map(|entry| entry.reference.as_ref().unwrap().to_string())
        .collect();
    assert_eq!(
        references,
        vec![
            "node:100:name",
            "node:100:description",
            "way:200:name",
            "relation:300:name",
        ]
    );

    assert_eq!(entries[0].source_text, "Kava & Knihi");
    assert_eq!(entries[1].source_text, "Books\nand coffee");
    assert_eq!(entries[2].translated_text, "Leninstraße");
    assert!(!entries[3].is_translated());
    assert_eq!(entries[3].comments, vec!["type=boundary", "name=Minsk"]);
}

#[test]
fn test_export_translate_import_round_trip() {
    let document = Document::parse(CITY).unwrap();
    let mut entries = po::parse(&export(&document, "be"));
    for entry in &mut entries {
        entry.translated_text = format!("{} (be)", entry.source_text);
    }

    let summary_document = {
        let mut document = document.clone();
        let summary = merge_into(&mut document, &entries, &ImportConfig::new("be"));
        assert_eq!(
            summary,
            MergeSummary {
                modified_records: 3,
                inserted_tags: 4,
                ..Default::default()
            }
        );
        document
    };

    let reparsed = Document::parse(summary_document.to_xml()).unwrap();
    let cafe = reparsed.find(RecordKind::Node, "100").unwrap();
    assert_eq!(cafe.tag("name:be"), Some("Kava & Knihi (be)"));
    assert_eq!(cafe.tag("description:be"), Some("Books\nand coffee (be)"));
    assert_eq!(
        reparsed.find(RecordKind::Relation, "300").unwrap().tag("name:be"),
        Some("Minsk (be)")
    );

    // Untouched records are copied verbatim.
    let xml = summary_document.to_xml();
    assert!(xml.contains("  <node id=\"101\" lat=\"53.91\" lon=\"27.57\"/>\n"));
    assert!(xml.contains("  <way id=\"201\">\n    <tag k=\"building\" v=\"yes\"/>"));
    assert!(xml.contains("<tag k=\"description:be\" v=\"Books&#10;and coffee (be)\"/>"));

    // Exporting again picks the new translations up as msgstr.
    let again = po::parse(&export(&reparsed, "be"));
    assert_eq!(again.len(), entries.len());
    for (before, after) in entries.iter().zip(&again) {
        assert_eq!(before.source_text, after.source_text);
        assert_eq!(before.translated_text, after.translated_text);
    }
}

#[test]
fn test_import_is_idempotent() {
    let catalog = indoc! {r#"

        #: way:200:name
        msgid "Lenina"
        msgstr "Leninstraße"

        #: relation:300:name
        msgid "Minsk"
        msgstr "Minsk"
    "#};
    let entries = po::parse(catalog);
    let config = ImportConfig::new("de");

    let once = merge(Document::parse(CITY).unwrap(), &entries, &config);
    let relation = once.find(RecordKind::Relation, "300").unwrap();
    assert!(relation.is_modified());
    assert!(!once.find(RecordKind::Way, "200").unwrap().is_modified());

    let mut twice = Document::parse(once.to_xml()).unwrap();
    let summary = merge_into(&mut twice, &entries, &config);
    assert_eq!(summary.modified_records, 0);
    assert_eq!(summary.unchanged_tags, 2);
    assert_eq!(twice.to_xml(), once.to_xml());
}

#[test]
fn test_missing_translations_and_dangling_references() {
    let catalog = indoc! {r#"

        #: node:100:name
        msgid "Kava & Knihi"
        msgstr ""

        #: node:999:name
        msgid "Gone"
        msgstr "Weg"

        #: changeset:1:name
        msgid "Not a record"
        msgstr "Kein Objekt"
    "#};
    let entries = po::parse(catalog);
    assert!(entries[2].reference.is_none());

    let mut document = Document::parse(CITY).unwrap();
    let summary = merge_into(&mut document, &entries, &ImportConfig::new("de"));
    assert_eq!(summary.dangling_entries, 1);
    assert_eq!(summary.modified_records, 0);
    assert_eq!(document.to_xml(), CITY);
}

#[test]
fn test_double_escaped_translation_is_normalised_on_import() {
    let source = indoc! {r#"
        <osm>
          <node id="7">
            <tag k="shop" v="electronics"/>
            <tag k="name" v="AT&amp;T"/>
            <tag k="name:de" v="AT&amp;amp;T"/>
          </node>
        </osm>
    "#};
    let document = Document::parse(source).unwrap();
    assert_eq!(document.records()[0].tag("name:de"), Some("AT&amp;T"));

    let entries = po::parse(&export(&document, "de"));
    assert_eq!(entries[0].translated_text, "AT&T");

    let mut merged = document.clone();
    let summary = merge_into(&mut merged, &entries, &ImportConfig::new("de"));
    assert_eq!(summary.updated_tags, 1);
    assert!(merged.to_xml().contains(r#"<tag k="name:de" v="AT&amp;T"/>"#));

    let mut again = Document::parse(merged.to_xml()).unwrap();
    let summary = merge_into(&mut again, &entries, &ImportConfig::new("de"));
    assert_eq!(summary.modified_records, 0);
    assert_eq!(summary.unchanged_tags, 1);
}

#[test]
fn test_rule_order_is_deterministic() {
    let rules = RuleSet::from_yaml(indoc! {"
        - type: way
          match: { has_tag: highway }
          tags: [name]
        - match: { has_tag: highway }
          tags: [name, old_name]
    "})
    .unwrap();
    let document = Document::parse(indoc! {r#"
        <osm>
          <way id="42">
            <tag k="highway" v="primary"/>
            <tag k="old_name" v="Stalina"/>
            <tag k="name" v="Main St"/>
          </way>
        </osm>
    "#})
    .unwrap();

    let record = &document.records()[0];
    assert_eq!(rules.match_record(record), vec!["name", "old_name"]);

    let text = Extractor::new(&rules, ExportConfig::new("de")).extract(record);
    assert_eq!(text.matches("msgid").count(), 2);
    assert!(text.find("#: way:42:name").unwrap() < text.find("#: way:42:old_name").unwrap());
}

#[test]
fn test_files_through_parser_trait() {
    let dir = tempdir().unwrap();
    let osm_path = dir.path().join("city.osm");
    let po_path = dir.path().join("city.po");
    let out_path = dir.path().join("city-de.osm");
    fs::write(&osm_path, CITY).unwrap();

    let document = Document::read_from(&osm_path).unwrap();
    let catalog = Catalog {
        entries: po::parse(&export(&document, "de")),
    };
    catalog.write_to(&po_path).unwrap();

    let mut catalog = Catalog::read_from(&po_path).unwrap();
    assert_eq!(catalog.entries.len(), 4);
    catalog.entries[3].translated_text = "Minsk".to_string();

    let document = merge(document, &catalog.entries, &ImportConfig::new("de"));
    document.write_to(&out_path).unwrap();

    let written = fs::read_to_string(&out_path).unwrap();
    assert!(written.contains("<relation id=\"300\" action=\"modify\">"));
    assert!(written.contains("    <tag k=\"name:de\" v=\"Minsk\"/>\n  </relation>"));
}

#[test]
fn test_utf16_catalog_with_bom() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("utf16.po");
    let text = "\n#: node:100:name\nmsgid \"Kava & Knihi\"\nmsgstr \"Кава і кнігі\"\n";
    let mut bytes = vec![0xFF, 0xFE];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    fs::write(&path, bytes).unwrap();

    let catalog = Catalog::read_from(&path).unwrap();
    assert_eq!(catalog.entries.len(), 1);
    assert_eq!(catalog.entries[0].translated_text, "Кава і кнігі");
}
