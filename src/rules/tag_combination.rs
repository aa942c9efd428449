//! Suspicious and incomplete tag combinations

use crate::class::RuleClass;
use crate::rule::RuleDefinition;

const MAXHEIGHT_HIGHWAYS: &str =
    "/^(motorway_link|trunk_link|primary|primary_link|secondary|secondary_link)$/";

const ROOF_TITLE: &str = "{0.tag} together with {1.tag}, usually {1.tag} is located underneath the {0.value}. Tag the {1.key} as a separate object.";

const HIGHWAY_TRAP: &str = "Check if it is really a highway and it is not already mapped.";

pub fn classes() -> Vec<RuleClass> {
    vec![
        RuleClass::new(20800, 2080, 1, "Tag highway missing on junction")
            .with_tags(&["tag", "highway", "roundabout", "fix:chair"])
            .with_trap(HIGHWAY_TRAP)
            .with_detail("The way has a tag `junction=*` but without `highway=*`."),
        RuleClass::new(20801, 2080, 1, "Tag highway missing on oneway")
            .with_tags(&["tag", "highway", "fix:chair"])
            .with_trap(HIGHWAY_TRAP)
            .with_detail("The way has a tag `oneway=*` but without `highway=*`."),
        RuleClass::new(20802, 2080, 2, "Missing tag ref for emergency access point")
            .with_tags(&["tag", "highway"]),
        RuleClass::new(21102, 2110, 2, "Missing relation type")
            .with_tags(&["tag"])
            .with_detail("The relation is missing a `type` tag to define what it represents."),
        RuleClass::new(30320, 3032, 1, "Watch multiple tags")
            .with_tags(&["tag", "fix:chair", "highway"]),
        RuleClass::new(30322, 3032, 3, ROOF_TITLE).with_tags(&["tag"]),
        RuleClass::new(30327, 3032, 2, "Waterway with `level`")
            .with_tags(&["tag", "fix:chair"])
            .with_trap("Remove `level` and check if `layer` is needed instead.")
            .with_detail("The tag `level` should be used for buildings, shops, amenities, etc."),
        RuleClass::new(32301, 3230, 2, "Probably only for bottles, not any type of glass")
            .with_tags(&["tag", "fix:chair"])
            .with_detail(
                "Most street-side glass containers only accept soda-lime glass (e.g. bottles and jars), \
                 but not glasses for high temperatures or window glass.",
            )
            .with_resource("https://wiki.openstreetmap.org/wiki/Tag:amenity=recycling"),
        RuleClass::new(32302, 3230, 2, "Suspicious name for a container")
            .with_tags(&["tag", "fix:chair"]),
        RuleClass::new(40106, 4010, 3, "Deprecated tag")
            .with_tags(&["tag", "tree", "fix:chair", "deprecated"]),
        RuleClass::new(40201, 4020, 1, "Roundabout as area")
            .with_tags(&["tag", "fix:chair", "highway", "roundabout"]),
        RuleClass::new(71301, 7130, 3, "Missing maxheight tag")
            .with_tags(&["tag", "highway", "maxheight", "fix:survey"])
            .with_detail(
                "Missing `maxheight=*` or `maxheight:physical=*` for a tunnel or a way under a bridge.",
            ),
        RuleClass::new(303211, 3032, 3, "suspicious tag combination").with_tags(&["tag"]),
    ]
}

pub fn rules() -> Vec<RuleDefinition> {
    vec![
        // Any kind
        RuleDefinition::new(30322, "*[building=roof][amenity][amenity!=shelter][parking!=rooftop]")
            .with_name("roof-with-amenity")
            .assert_match("way building=roof amenity=fuel")
            .assert_no_match("way building=roof amenity=parking parking=rooftop"),
        RuleDefinition::new(20802, "*[highway=emergency_access_point][!ref]")
            .with_name("emergency-access-point-without-ref")
            .with_subclass(1),
        RuleDefinition::new(
            32301,
            r#"*[amenity=recycling][recycling_type!=centre][recycling:glass=yes][outside("CZ")]"#,
        )
        .with_name("recycling-glass")
        .fix_remove("recycling:glass")
        .fix_add("recycling:glass_bottles=yes")
        .assert_no_match_in("node amenity=recycling recycling_type=container recycling:glass=yes", "CZ")
        .assert_match_in("node amenity=recycling recycling_type=container recycling:glass=yes", "FR"),
        RuleDefinition::new(32302, "*[amenity=recycling][recycling_type!=centre][name]")
            .with_name("recycling-container-name")
            .assert_match(
                r#"node amenity=recycling recycling_type=container name="My nice awesome container""#,
            ),
        // Points
        RuleDefinition::new(40106, "node[natural=tree][type][type!=palm]")
            .with_name("tree-type")
            .with_text("The tag `{1.key}` is deprecated in favour of `leaf_type`"),
        RuleDefinition::new(
            303211,
            "node[tunnel][!highway][!area:highway][!railway][!waterway][!piste:type][type!=tunnel]\
             [public_transport!=platform][route!=ferry][man_made!=pipeline][man_made!=goods_conveyor]\
             [man_made!=wildlife_crossing][man_made!=tunnel][power!=cable]",
        )
        .with_name("tunnel-on-point")
        .with_text("{0.key} on suspicious object"),
        // Lines
        RuleDefinition::new(30320, "way[highway][fee][!amenity][!leisure]")
            .with_name("fee-on-highway")
            .with_subclass(1000)
            .with_text(r#"Use tag "toll" instead of "fee""#)
            .fix_change_key("fee=>toll")
            .assert_match("way highway=primary fee=yes")
            .assert_no_match("way highway=service fee=yes amenity=weighbridge"),
        RuleDefinition::new(40201, "way[highway][junction=roundabout][area][area!=no]")
            .with_name("roundabout-area")
            .fix_remove("area")
            .assert_match("way area=yes highway=secondary junction=roundabout"),
        RuleDefinition::new(20800, "way[junction][junction!=yes][!highway][!area:highway]")
            .with_name("junction-without-highway")
            .assert_no_match("way junction=roundabout highway=service")
            .assert_match("way junction=roundabout waterway=river")
            .assert_no_match("way junction=yes"),
        RuleDefinition::new(
            20801,
            "way[oneway][!highway][!railway][!aerialway][!waterway][!aeroway][!piste:type]",
        )
        .with_name("oneway-without-highway")
        .assert_no_match("way highway=x cycleway=opposite oneway=yes")
        .assert_match("way oneway=yes building=yes"),
        RuleDefinition::new(30327, "way[waterway][level]")
            .with_name("waterway-level")
            .fix_change_key("level=>layer")
            .assert_match("way waterway=stream level=-1"),
        RuleDefinition::new(
            71301,
            &format!(
                "way[tunnel][highway=~{re}][!maxheight][!maxheight:physical][tunnel!=no], \
                 way[covered][highway=~{re}][!maxheight][!maxheight:physical][covered!=no]",
                re = MAXHEIGHT_HIGHWAYS
            ),
        )
        .with_name("missing-maxheight")
        .assert_no_match("way highway=primary covered=no")
        .assert_match("way highway=primary covered=yes")
        .assert_no_match("way highway=primary tunnel=yes maxheight=2.4")
        .assert_match("way highway=primary tunnel=yes"),
        // Relations
        RuleDefinition::new(21102, "relation[!type]")
            .with_name("relation-without-type")
            .assert_match("relation"),
    ]
}
