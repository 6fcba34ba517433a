// Prefecture names, in English and in Japanese.

/// The name used for the national total.
pub const NATIONWIDE: &str = "all";

const PREFECTURES: [(&str, &str); 47] = [
    ("Hokkaido", "北海道"),
    ("Aomori", "青森県"),
    ("Iwate", "岩手県"),
    ("Miyagi", "宮城県"),
    ("Akita", "秋田県"),
    ("Yamagata", "山形県"),
    ("Fukushima", "福島県"),
    ("Ibaraki", "茨城県"),
    ("Tochigi", "栃木県"),
    ("Gunma", "群馬県"),
    ("Saitama", "埼玉県"),
    ("Chiba", "千葉県"),
    ("Tokyo", "東京都"),
    ("Kanagawa", "神奈川県"),
    ("Niigata", "新潟県"),
    ("Toyama", "富山県"),
    ("Ishikawa", "石川県"),
    ("Fukui", "福井県"),
    ("Yamanashi", "山梨県"),
    ("Nagano", "長野県"),
    ("Gifu", "岐阜県"),
    ("Shizuoka", "静岡県"),
    ("Aichi", "愛知県"),
    ("Mie", "三重県"),
    ("Shiga", "滋賀県"),
    ("Kyoto", "京都府"),
    ("Osaka", "大阪府"),
    ("Hyogo", "兵庫県"),
    ("Nara", "奈良県"),
    ("Wakayama", "和歌山県"),
    ("Tottori", "鳥取県"),
    ("Shimane", "島根県"),
    ("Okayama", "岡山県"),
    ("Hiroshima", "広島県"),
    ("Yamaguchi", "山口県"),
    ("Tokushima", "徳島県"),
    ("Kagawa", "香川県"),
    ("Ehime", "愛媛県"),
    ("Kochi", "高知県"),
    ("Fukuoka", "福岡県"),
    ("Saga", "佐賀県"),
    ("Nagasaki", "長崎県"),
    ("Kumamoto", "熊本県"),
    ("Oita", "大分県"),
    ("Miyazaki", "宮崎県"),
    ("Kagoshima", "鹿児島県"),
    ("Okinawa", "沖縄県"),
];

/// The English name of a prefecture, from any accepted spelling.
///
/// English names are matched without case. Japanese names may omit the
/// 都/道/府/県 suffix.
pub fn canonical_prefecture(name: &str) -> Option<&'static str> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let lower = name.to_lowercase();
    match lower.as_str() {
        "all" | "全国" | "nationwide" => return Some(NATIONWIDE),
        // Older romanization used in some data files.
        "gumma" => return Some("Gunma"),
        _ => {}
    }
    PREFECTURES
        .iter()
        .find(|(en, jp)| {
            en.to_lowercase() == lower || *jp == name || jp.strip_suffix(is_suffix) == Some(name)
        })
        .map(|(en, _)| *en)
}

/// The Japanese name of a prefecture given by its English name.
pub fn japanese_name(english: &str) -> Option<&'static str> {
    if english == NATIONWIDE {
        return Some("全国");
    }
    PREFECTURES
        .iter()
        .find(|(en, _)| *en == english)
        .map(|(_, jp)| *jp)
}

fn is_suffix(c: char) -> bool {
    matches!(c, '都' | '道' | '府' | '県')
}
