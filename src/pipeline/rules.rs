//! Text patterns the paragraph pass classifies by.
//!
//! Every table here is scanned in its listed order and the first hit wins, so
//! broader entries must stay below the narrower ones they would shadow.

use std::sync::LazyLock;

use regex::Regex;

/// Which canonical headings and caption labels the pass recognizes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HeadingScheme {
    /// Chinese section titles (壹、前言 … 陸、參考文獻) and 圖/表 captions.
    #[default]
    Chinese,
    /// The Chinese scheme plus English titles (I. Introduction …), Latin
    /// heading numbering and Figure/Table captions.
    Bilingual,
}

/// How a heading keyword is compared with a paragraph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum KeywordMatch {
    /// Keyword anywhere in a normalized text shorter than this many characters.
    Within(usize),
    /// Whole text, leading numbering aside, spells the keyword.
    Whole,
}

pub(crate) struct CanonicalHeading {
    /// Matched against text with all whitespace removed and lowercased.
    pub(crate) keyword: &'static str,
    pub(crate) title: &'static str,
    pub(crate) matching: KeywordMatch,
    /// The first section; it must never start a new page.
    pub(crate) introduction: bool,
}

const fn heading(keyword: &'static str, title: &'static str) -> CanonicalHeading {
    CanonicalHeading {
        keyword,
        title,
        matching: KeywordMatch::Within(CHINESE_CEILING),
        introduction: false,
    }
}

const fn whole(keyword: &'static str, title: &'static str) -> CanonicalHeading {
    CanonicalHeading {
        matching: KeywordMatch::Whole,
        ..heading(keyword, title)
    }
}

const CHINESE_CEILING: usize = 15;
const ENGLISH_REFERENCES: &str = "VI. References";

static CHINESE_HEADINGS: [CanonicalHeading; 8] = [
    CanonicalHeading {
        introduction: true,
        ..heading("前言", "壹、前言")
    },
    heading("文獻探討", "貳、文獻探討"),
    heading("研究方法", "參、研究方法"),
    heading("研究分析與結果", "肆、研究分析與結果"),
    heading("研究結論與建議", "伍、研究結論與建議"),
    heading("參考文獻", "陸、參考文獻"),
    heading("引註資料", "陸、參考文獻"),
    heading("參考資料", "陸、參考文獻"),
];

// English words like "results" show up in ordinary sentences, so these only
// match a paragraph that is nothing but the heading.
static ENGLISH_HEADINGS: [CanonicalHeading; 15] = [
    CanonicalHeading {
        introduction: true,
        ..whole("introduction", "I. Introduction")
    },
    whole("literaturereview", "II. Literature Review"),
    whole("researchmethods", "III. Research Methods"),
    whole("researchmethod", "III. Research Methods"),
    whole("researchmethodology", "III. Research Methods"),
    whole("methodology", "III. Research Methods"),
    whole("methods", "III. Research Methods"),
    whole("analysisandresults", "IV. Analysis and Results"),
    whole("results", "IV. Analysis and Results"),
    whole("conclusionsandsuggestions", "V. Conclusions and Suggestions"),
    whole("conclusions", "V. Conclusions and Suggestions"),
    whole("conclusion", "V. Conclusions and Suggestions"),
    whole("references", ENGLISH_REFERENCES),
    whole("bibliography", ENGLISH_REFERENCES),
    whole("workscited", ENGLISH_REFERENCES),
];

/// Numeral forms accepted after a Chinese caption label.
const ZH_NUMERAL: &str = r"(?:[0-9０-９]+|[零〇一二三四五六七八九十百]+|[甲乙丙丁戊己庚辛壬癸])";
/// Numeral forms accepted after an English caption label.
const EN_NUMERAL: &str = r"(?:[0-9]+|[ivxlc]+\b)";

static FIGURE_ZH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?s)^圖\s*{ZH_NUMERAL}(.*)$")).unwrap());
static TABLE_ZH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?s)^表\s*{ZH_NUMERAL}(.*)$")).unwrap());
static FIGURE_EN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?is)^(?:figure|fig\.)\s*{EN_NUMERAL}(.*)$")).unwrap()
});
static TABLE_EN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?is)^table\s*{EN_NUMERAL}(.*)$")).unwrap());

/// "1." / "IV." / "(I)" in front of an English heading.
static NUMBERING_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:[（(](?:[0-9]+|[ivx]+)[）)]|(?:[0-9]+|[ivx]+)[.)、])").unwrap()
});

static SECTION_ZH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[壹貳參肆伍陸]、").unwrap());
static SUBSECTION_ZH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[一二三四五六七八九十]+、").unwrap());
static ITEM_ZH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[（(][一二三四五六七八九十]+[）)]").unwrap());
static POINT_ZH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9０-９]+、").unwrap());

static SECTION_LATIN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[IVX]+\.\s").unwrap());
static SUBSECTION_LATIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[（(][IVX]+[）)]").unwrap());
static ITEM_LATIN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z]\.\s").unwrap());

/// Numbered heading levels recognized in body text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeadingLevel {
    /// 壹、 / I.
    Section,
    /// 一、 / (I)
    Subsection,
    /// （一） / A.
    Item,
    /// １、
    Point,
}

impl HeadingLevel {
    /// Section and subsection headings sit flush left; lower levels keep the
    /// body first-line indent.
    pub(crate) fn is_flush(self) -> bool {
        matches!(self, HeadingLevel::Section | HeadingLevel::Subsection)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CaptionKind {
    Figure,
    Table,
}

struct CaptionPattern {
    kind: CaptionKind,
    regex: &'static LazyLock<Regex>,
    /// Emitted in place of the author's label, directly before the number.
    label: &'static str,
}

static CHINESE_CAPTIONS: [CaptionPattern; 2] = [
    CaptionPattern {
        kind: CaptionKind::Figure,
        regex: &FIGURE_ZH,
        label: "圖",
    },
    CaptionPattern {
        kind: CaptionKind::Table,
        regex: &TABLE_ZH,
        label: "表",
    },
];

static ENGLISH_CAPTIONS: [CaptionPattern; 2] = [
    CaptionPattern {
        kind: CaptionKind::Figure,
        regex: &FIGURE_EN,
        label: "Figure ",
    },
    CaptionPattern {
        kind: CaptionKind::Table,
        regex: &TABLE_EN,
        label: "Table ",
    },
];

pub(crate) struct Caption<'t> {
    pub(crate) label: &'static str,
    /// Everything after the author's numeral, spacing included.
    pub(crate) rest: &'t str,
}

impl Caption<'_> {
    pub(crate) fn rebuild(&self, number: u32) -> String {
        format!("{}{}{}", self.label, number, self.rest)
    }
}

/// The compiled rule set for one scheme.
pub(crate) struct Rules {
    scheme: HeadingScheme,
    headings: Vec<&'static CanonicalHeading>,
    captions: Vec<&'static CaptionPattern>,
    levels: Vec<(&'static LazyLock<Regex>, HeadingLevel)>,
}

/// Whitespace-free, lowercased copy used for keyword matching.
pub(crate) fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Lowercased letters and digits left once any leading numbering is dropped.
fn heading_key(text: &str) -> String {
    let rest = NUMBERING_PREFIX.find(text).map_or(text, |m| &text[m.end()..]);
    rest.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

impl Rules {
    pub(crate) fn new(scheme: HeadingScheme) -> Self {
        let mut headings: Vec<&'static CanonicalHeading> = CHINESE_HEADINGS.iter().collect();
        let mut captions: Vec<&'static CaptionPattern> = CHINESE_CAPTIONS.iter().collect();
        let mut levels = vec![
            (&SECTION_ZH, HeadingLevel::Section),
            (&SUBSECTION_ZH, HeadingLevel::Subsection),
            (&ITEM_ZH, HeadingLevel::Item),
            (&POINT_ZH, HeadingLevel::Point),
        ];
        if scheme == HeadingScheme::Bilingual {
            headings.extend(ENGLISH_HEADINGS.iter());
            captions.extend(ENGLISH_CAPTIONS.iter());
            levels.extend([
                (&SECTION_LATIN, HeadingLevel::Section),
                (&SUBSECTION_LATIN, HeadingLevel::Subsection),
                (&ITEM_LATIN, HeadingLevel::Item),
            ]);
        }
        Self {
            scheme,
            headings,
            captions,
            levels,
        }
    }

    /// First canonical heading the text is recognized as.
    pub(crate) fn canonical_heading(&self, text: &str) -> Option<&'static CanonicalHeading> {
        let normalized = normalize(text);
        let len = normalized.chars().count();
        let key = heading_key(text);
        self.headings.iter().copied().find(|h| match h.matching {
            KeywordMatch::Within(ceiling) => len < ceiling && normalized.contains(h.keyword),
            KeywordMatch::Whole => key == h.keyword,
        })
    }

    pub(crate) fn caption<'t>(&self, kind: CaptionKind, text: &'t str) -> Option<Caption<'t>> {
        self.captions
            .iter()
            .filter(|p| p.kind == kind)
            .find_map(|p| {
                let caps = p.regex.captures(text)?;
                Some(Caption {
                    label: p.label,
                    rest: caps.get(1).map_or("", |m| m.as_str()),
                })
            })
    }

    /// The heading that opens the bibliography section.
    pub(crate) fn is_bibliography_heading(&self, text: &str) -> bool {
        let len = text.chars().count();
        if text.contains("參考文獻")
            && (text.starts_with('陸') || text.starts_with('六') || len < 10)
        {
            return true;
        }
        self.scheme == HeadingScheme::Bilingual
            && self
                .canonical_heading(text)
                .is_some_and(|h| h.title == ENGLISH_REFERENCES)
    }

    pub(crate) fn heading_level(&self, text: &str) -> Option<HeadingLevel> {
        self.levels
            .iter()
            .find(|(re, _)| re.is_match(text))
            .map(|(_, level)| *level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_keyword_in_short_text() {
        let rules = Rules::new(HeadingScheme::Chinese);
        let h = rules.canonical_heading("一 、 前 言").unwrap();
        assert_eq!(h.title, "壹、前言");
        assert!(h.introduction);
    }

    #[test]
    fn heading_keyword_in_long_text_ignored() {
        let rules = Rules::new(HeadingScheme::Chinese);
        let text = "本研究的前言部分說明了研究動機與研究目的";
        assert!(text.chars().count() >= CHINESE_CEILING);
        assert!(rules.canonical_heading(text).is_none());
    }

    #[test]
    fn reference_aliases_share_title() {
        let rules = Rules::new(HeadingScheme::Chinese);
        for text in ["參考文獻", "引註資料", "參考資料"] {
            assert_eq!(rules.canonical_heading(text).unwrap().title, "陸、參考文獻");
        }
    }

    #[test]
    fn english_headings_need_bilingual() {
        let zh = Rules::new(HeadingScheme::Chinese);
        let both = Rules::new(HeadingScheme::Bilingual);
        assert!(zh.canonical_heading("Introduction").is_none());
        assert_eq!(
            both.canonical_heading("1. INTRODUCTION").unwrap().title,
            "I. Introduction"
        );
        assert_eq!(
            both.canonical_heading("Research Methodology").unwrap().title,
            "III. Research Methods"
        );
    }

    #[test]
    fn english_heading_words_inside_sentences_ignored() {
        let rules = Rules::new(HeadingScheme::Bilingual);
        for text in [
            "The results are shown in Table 2.",
            "In conclusion, the method works.",
            "See the references for details.",
            "Table 2 Results",
        ] {
            assert!(rules.canonical_heading(text).is_none(), "{text}");
            assert!(!rules.is_bibliography_heading(text), "{text}");
        }
        assert_eq!(
            rules.canonical_heading("(IV) Results").unwrap().title,
            "IV. Analysis and Results"
        );
        assert_eq!(
            rules.canonical_heading("5. Conclusions:").unwrap().title,
            "V. Conclusions and Suggestions"
        );
    }

    #[test]
    fn canonical_titles_match_themselves() {
        let rules = Rules::new(HeadingScheme::Bilingual);
        for h in CHINESE_HEADINGS.iter().chain(ENGLISH_HEADINGS.iter()) {
            let found = rules.canonical_heading(h.title).unwrap();
            assert_eq!(found.title, h.title, "{}", h.title);
        }
    }

    #[test]
    fn figure_caption_numerals() {
        let rules = Rules::new(HeadingScheme::Chinese);
        for (text, rest) in [
            ("圖三 實驗裝置", " 實驗裝置"),
            ("圖 12：流程", "：流程"),
            ("圖 甲 流程", " 流程"),
            ("圖２ 結果", " 結果"),
        ] {
            let cap = rules.caption(CaptionKind::Figure, text).unwrap();
            assert_eq!(cap.rest, rest, "{text}");
        }
        assert!(rules.caption(CaptionKind::Figure, "圖書館的使用情形").is_none());
        assert!(rules.caption(CaptionKind::Table, "圖1 結果").is_none());
    }

    #[test]
    fn caption_rebuild() {
        let rules = Rules::new(HeadingScheme::Bilingual);
        let cap = rules.caption(CaptionKind::Table, "表2 結果").unwrap();
        assert_eq!(cap.rebuild(1), "表1 結果");
        let cap = rules.caption(CaptionKind::Figure, "Fig. 7: Setup").unwrap();
        assert_eq!(cap.rebuild(3), "Figure 3: Setup");
        let cap = rules.caption(CaptionKind::Table, "TABLE IV Scores").unwrap();
        assert_eq!(cap.rebuild(2), "Table 2 Scores");
    }

    #[test]
    fn english_caption_needs_numeral() {
        let rules = Rules::new(HeadingScheme::Bilingual);
        assert!(rules.caption(CaptionKind::Table, "Table of contents").is_none());
        assert!(rules.caption(CaptionKind::Figure, "Figures illustrate").is_none());
        assert!(Rules::new(HeadingScheme::Chinese)
            .caption(CaptionKind::Figure, "Figure 1 Setup")
            .is_none());
    }

    #[test]
    fn bibliography_heading() {
        let zh = Rules::new(HeadingScheme::Chinese);
        assert!(zh.is_bibliography_heading("陸、參考文獻"));
        assert!(zh.is_bibliography_heading("六、參考文獻與附錄資料整理"));
        assert!(zh.is_bibliography_heading("參考文獻"));
        assert!(!zh.is_bibliography_heading("本節整理相關的參考文獻並加以討論"));
        assert!(!zh.is_bibliography_heading("VI. References"));

        let both = Rules::new(HeadingScheme::Bilingual);
        assert!(both.is_bibliography_heading("VI. References"));
        assert!(both.is_bibliography_heading("Bibliography"));
        assert!(!both.is_bibliography_heading(
            "Several references discuss this topic in more depth"
        ));
    }

    #[test]
    fn heading_levels() {
        let zh = Rules::new(HeadingScheme::Chinese);
        assert_eq!(zh.heading_level("壹、前言"), Some(HeadingLevel::Section));
        assert_eq!(zh.heading_level("二、研究目的"), Some(HeadingLevel::Subsection));
        assert_eq!(zh.heading_level("（一）樣本"), Some(HeadingLevel::Item));
        assert_eq!(zh.heading_level("(三)工具"), Some(HeadingLevel::Item));
        assert_eq!(zh.heading_level("１、說明"), Some(HeadingLevel::Point));
        assert_eq!(zh.heading_level("I. Introduction"), None);
        assert_eq!(zh.heading_level("一般內文"), None);

        let both = Rules::new(HeadingScheme::Bilingual);
        assert_eq!(both.heading_level("II. Review"), Some(HeadingLevel::Section));
        assert_eq!(both.heading_level("(IV) Data"), Some(HeadingLevel::Subsection));
        assert_eq!(both.heading_level("B. Sample"), Some(HeadingLevel::Item));
        assert!(HeadingLevel::Subsection.is_flush());
        assert!(!HeadingLevel::Item.is_flush());
    }
}
