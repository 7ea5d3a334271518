use std::fmt;
use std::str::FromStr;

use crate::common::error::DnsError;

/// 未提供 TTL 的应答在缓存中的默认存活时间（秒）
pub const DEFAULT_TTL: u32 = 60;

/// 未指定查询类型时使用的默认类型集合
pub const DEFAULT_TYPES: [RecordType; 1] = [RecordType::A];

/// 记录类型的数值形式（RFC 1035 TYPE 码）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum RecordType {
    A = 1,
    Cname = 5,
    Txt = 16,
    Aaaa = 28,
}

impl RecordType {
    pub const ALL: [RecordType; 4] = [
        RecordType::A,
        RecordType::Cname,
        RecordType::Txt,
        RecordType::Aaaa,
    ];

    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn label(self) -> RecordTypeLabel {
        match self {
            RecordType::A => RecordTypeLabel::A,
            RecordType::Cname => RecordTypeLabel::Cname,
            RecordType::Txt => RecordTypeLabel::Txt,
            RecordType::Aaaa => RecordTypeLabel::Aaaa,
        }
    }
}

impl TryFrom<u16> for RecordType {
    type Error = DnsError;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        RecordType::ALL
            .into_iter()
            .find(|t| t.code() == code)
            .ok_or_else(|| DnsError::UnsupportedRecordType(code.to_string()))
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// 记录类型的文本形式（"A"、"AAAA" 等）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordTypeLabel {
    A,
    Cname,
    Txt,
    Aaaa,
}

impl RecordTypeLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordTypeLabel::A => "A",
            RecordTypeLabel::Cname => "CNAME",
            RecordTypeLabel::Txt => "TXT",
            RecordTypeLabel::Aaaa => "AAAA",
        }
    }

    pub fn value(self) -> RecordType {
        match self {
            RecordTypeLabel::A => RecordType::A,
            RecordTypeLabel::Cname => RecordType::Cname,
            RecordTypeLabel::Txt => RecordType::Txt,
            RecordTypeLabel::Aaaa => RecordType::Aaaa,
        }
    }
}

impl FromStr for RecordTypeLabel {
    type Err = DnsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordType::ALL
            .into_iter()
            .map(RecordType::label)
            .find(|l| l.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DnsError::UnsupportedRecordType(s.to_string()))
    }
}

impl fmt::Display for RecordTypeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 同一记录类型的两种表示形式之一
///
/// 后端按调用方要求的形式标注应答类型，缓存键则始终使用数值形式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnyRecordType {
    Value(RecordType),
    Label(RecordTypeLabel),
}

impl AnyRecordType {
    pub fn is_value(self) -> bool {
        matches!(self, AnyRecordType::Value(_))
    }

    pub fn to_value(self) -> RecordType {
        match self {
            AnyRecordType::Value(t) => t,
            AnyRecordType::Label(l) => l.value(),
        }
    }

    pub fn to_label(self) -> RecordTypeLabel {
        match self {
            AnyRecordType::Value(t) => t.label(),
            AnyRecordType::Label(l) => l,
        }
    }

    /// 转换到指定形式；已经是该形式时原样返回
    pub fn convert(self, use_record_type_value: bool) -> AnyRecordType {
        if use_record_type_value {
            AnyRecordType::Value(self.to_value())
        } else {
            AnyRecordType::Label(self.to_label())
        }
    }
}

impl From<RecordType> for AnyRecordType {
    fn from(t: RecordType) -> Self {
        AnyRecordType::Value(t)
    }
}

impl From<RecordTypeLabel> for AnyRecordType {
    fn from(l: RecordTypeLabel) -> Self {
        AnyRecordType::Label(l)
    }
}

impl PartialEq<RecordType> for AnyRecordType {
    fn eq(&self, other: &RecordType) -> bool {
        matches!(self, AnyRecordType::Value(t) if t == other)
    }
}

impl PartialEq<RecordTypeLabel> for AnyRecordType {
    fn eq(&self, other: &RecordTypeLabel) -> bool {
        matches!(self, AnyRecordType::Label(l) if l == other)
    }
}

/// 纯数字解析为数值形式，其余按标签解析
impl FromStr for AnyRecordType {
    type Err = DnsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.parse::<u16>() {
            Ok(code) => Ok(RecordType::try_from(code)?.into()),
            Err(_) => Ok(s.parse::<RecordTypeLabel>()?.into()),
        }
    }
}

impl fmt::Display for AnyRecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnyRecordType::Value(t) => fmt::Display::fmt(t, f),
            AnyRecordType::Label(l) => fmt::Display::fmt(l, f),
        }
    }
}

pub fn convert_type(record_type: impl Into<AnyRecordType>, use_record_type_value: bool) -> AnyRecordType {
    record_type.into().convert(use_record_type_value)
}

/// 规范化请求的类型集合
///
/// `None` 与空切片都回退到 [`DEFAULT_TYPES`]。
pub fn get_types(types: Option<&[AnyRecordType]>, use_record_type_value: bool) -> Vec<AnyRecordType> {
    match types {
        Some(types) if !types.is_empty() => types
            .iter()
            .map(|t| t.convert(use_record_type_value))
            .collect(),
        _ => DEFAULT_TYPES
            .iter()
            .map(|t| convert_type(*t, use_record_type_value))
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub name: String,
    pub record_type: AnyRecordType,
}

impl Question {
    pub fn new(name: impl Into<String>, record_type: impl Into<AnyRecordType>) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.into(),
        }
    }
}

/// 单条解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub name: String,
    pub record_type: AnyRecordType,
    pub data: String,
    /// 剩余存活时间（秒）；来自缓存时为读取时刻的剩余值
    pub ttl: Option<u32>,
}

impl Answer {
    pub fn new(
        name: impl Into<String>,
        record_type: impl Into<AnyRecordType>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.into(),
            data: data.into(),
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DnsResponse {
    /// RCODE
    pub status: u16,
    pub truncated: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
    pub authentic_data: bool,
    pub checking_disabled: bool,
    pub questions: Vec<Question>,
    pub answers: Vec<Answer>,
}

impl DnsResponse {
    pub fn new(questions: Vec<Question>, answers: Vec<Answer>) -> Self {
        Self {
            questions,
            answers,
            ..Default::default()
        }
    }

    /// 将问题与应答中的类型统一转换为指定形式
    pub fn with_type_form(mut self, use_record_type_value: bool) -> Self {
        for question in &mut self.questions {
            question.record_type = question.record_type.convert(use_record_type_value);
        }
        for answer in &mut self.answers {
            answer.record_type = answer.record_type.convert(use_record_type_value);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_and_label_are_bijective() {
        for t in RecordType::ALL {
            assert_eq!(t.label().value(), t);
            assert_eq!(RecordType::try_from(t.code()).unwrap(), t);
            assert_eq!(t.label().as_str().parse::<RecordTypeLabel>().unwrap(), t.label());
        }
    }

    #[test]
    fn convert_same_form_is_identity() {
        assert_eq!(convert_type(RecordType::Aaaa, true), RecordType::Aaaa);
        assert_eq!(convert_type(RecordTypeLabel::Txt, false), RecordTypeLabel::Txt);
    }

    #[test]
    fn convert_across_forms() {
        assert_eq!(convert_type(RecordType::Cname, false), RecordTypeLabel::Cname);
        assert_eq!(convert_type(RecordTypeLabel::Aaaa, true), RecordType::Aaaa);
    }

    #[test]
    fn unsupported_types_are_rejected() {
        assert!(matches!(
            RecordType::try_from(15u16),
            Err(DnsError::UnsupportedRecordType(s)) if s == "15"
        ));
        assert!("MX".parse::<AnyRecordType>().is_err());
        assert!("99".parse::<AnyRecordType>().is_err());
    }

    #[test]
    fn parse_any_record_type() {
        assert_eq!("28".parse::<AnyRecordType>().unwrap(), RecordType::Aaaa);
        assert_eq!("txt".parse::<AnyRecordType>().unwrap(), RecordTypeLabel::Txt);
        assert_eq!(AnyRecordType::from(RecordType::Txt).to_string(), "16");
        assert_eq!(AnyRecordType::from(RecordTypeLabel::Txt).to_string(), "TXT");
    }

    #[test]
    fn default_types_in_requested_form() {
        assert_eq!(get_types(None, true), vec![AnyRecordType::Value(RecordType::A)]);
        assert_eq!(get_types(None, false), vec![AnyRecordType::Label(RecordTypeLabel::A)]);
    }

    #[test]
    fn empty_request_falls_back_to_default() {
        assert_eq!(get_types(Some(&[]), true), get_types(None, true));
    }

    #[test]
    fn requested_types_are_normalized_in_order() {
        let requested = [
            AnyRecordType::Label(RecordTypeLabel::Aaaa),
            AnyRecordType::Value(RecordType::A),
        ];
        assert_eq!(
            get_types(Some(&requested), true),
            vec![AnyRecordType::from(RecordType::Aaaa), RecordType::A.into()]
        );
        assert_eq!(
            get_types(Some(&requested), false),
            vec![AnyRecordType::from(RecordTypeLabel::Aaaa), RecordTypeLabel::A.into()]
        );
    }

    #[test]
    fn response_type_form_is_rewritten() {
        let response = DnsResponse::new(
            vec![Question::new("example.com", RecordType::A)],
            vec![Answer::new("example.com", RecordTypeLabel::A, "1.2.3.4").with_ttl(5)],
        )
        .with_type_form(false);
        assert_eq!(response.questions[0].record_type, RecordTypeLabel::A);
        assert_eq!(response.answers[0].record_type, RecordTypeLabel::A);
        assert_eq!(response.answers[0].ttl, Some(5));
    }
}
