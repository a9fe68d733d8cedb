//! Path helpers - 점(.)으로 구분된 경로로 JSON 값을 읽고 쓰기
//!
//! `a.b.0.c` 형태의 경로를 지원합니다. 숫자 세그먼트는 배열 인덱스로 해석됩니다.

use crate::{Error, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// JSON 값 종류 이름 (에러 메시지용)
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Array(_) | Value::Object(_))
}

fn child<'a>(current: &'a Value, segment: &str) -> Option<&'a Value> {
    match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

// ============================================================================
// Get
// ============================================================================

/// 경로의 값 조회
pub fn get_path<'a>(target: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }

    path.split('.')
        .try_fold(target, |current, segment| child(current, segment))
}

// ============================================================================
// Set
// ============================================================================

/// 경로에 값 쓰기 (중간 객체는 자동 생성)
pub fn set_path(target: &mut Value, path: &str, value: Value) -> Result<()> {
    if path.is_empty() {
        return Err(Error::IllegalArgument("path must not be empty".to_string()));
    }

    let segments: Vec<&str> = path.split('.').collect();
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| Error::IllegalArgument(format!("invalid path: {}", path)))?;

    let mut current = target;
    for segment in parents {
        if !is_container(current) {
            *current = Value::Object(Map::new());
        }

        current = match current {
            Value::Object(map) => {
                let entry = map
                    .entry(segment.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !is_container(entry) {
                    *entry = Value::Object(Map::new());
                }
                entry
            }
            Value::Array(items) => {
                let index = array_index(items.len(), segment, path)?;
                if index == items.len() {
                    items.push(Value::Object(Map::new()));
                }
                let entry = &mut items[index];
                if !is_container(entry) {
                    *entry = Value::Object(Map::new());
                }
                entry
            }
            _ => unreachable!("intermediate value is always a container"),
        };
    }

    if !is_container(current) {
        *current = Value::Object(Map::new());
    }

    match current {
        Value::Object(map) => {
            map.insert(last.to_string(), value);
        }
        Value::Array(items) => {
            let index = array_index(items.len(), last, path)?;
            if index == items.len() {
                items.push(value);
            } else {
                items[index] = value;
            }
        }
        _ => unreachable!("target is always a container"),
    }

    Ok(())
}

fn array_index(len: usize, segment: &str, path: &str) -> Result<usize> {
    let index = segment.parse::<usize>().map_err(|_| {
        Error::IllegalArgument(format!("'{}' is not an array index in {}", segment, path))
    })?;
    if index > len {
        return Err(Error::IllegalArgument(format!(
            "index {} out of range in {} (len {})",
            index, path, len
        )));
    }
    Ok(index)
}

// ============================================================================
// List
// ============================================================================

/// 모든 경로를 평탄화하여 나열
///
/// `exclude`가 true면 객체/배열 값은 결과에서 제외하고 리프만 남깁니다.
pub fn list_paths(target: &Value, exclude: bool) -> BTreeMap<String, Value> {
    let mut maps = BTreeMap::new();
    if is_container(target) {
        walk("", target, exclude, &mut maps);
    }
    maps
}

fn walk(prefix: &str, value: &Value, exclude: bool, maps: &mut BTreeMap<String, Value>) {
    let entries: Vec<(String, &Value)> = match value {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => return,
    };

    for (key, item) in entries {
        let path = if prefix.is_empty() {
            key
        } else {
            format!("{}.{}", prefix, key)
        };

        if is_container(item) {
            if !exclude {
                maps.insert(path.clone(), item.clone());
            }
            walk(&path, item, exclude, maps);
        } else {
            maps.insert(path, item.clone());
        }
    }
}

// ============================================================================
// Merge
// ============================================================================

/// 재귀 병합
///
/// 최상위 값의 종류(객체/배열)가 다르면 `IllegalMerge`. 하위 경로에서 종류가
/// 다르면 `src` 값으로 덮어씁니다.
pub fn merge_value(dst: &mut Value, src: &Value) -> Result<()> {
    if !is_container(dst) {
        return Err(Error::IllegalMerge(format!(
            "merging is only available for objects and arrays, got {}",
            kind_of(dst)
        )));
    }
    if kind_of(dst) != kind_of(src) {
        return Err(Error::IllegalMerge(format!(
            "cannot merge {} into {}",
            kind_of(src),
            kind_of(dst)
        )));
    }

    merge_into(dst, src);
    Ok(())
}

fn merge_into(dst: &mut Value, src: &Value) {
    match (dst, src) {
        (Value::Object(d), Value::Object(s)) => {
            for (key, value) in s {
                match d.get_mut(key) {
                    Some(existing) => merge_into(existing, value),
                    None => {
                        d.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (Value::Array(d), Value::Array(s)) => {
            for (i, value) in s.iter().enumerate() {
                if i < d.len() {
                    merge_into(&mut d[i], value);
                } else {
                    d.push(value.clone());
                }
            }
        }
        (d, s) => *d = s.clone(),
    }
}
