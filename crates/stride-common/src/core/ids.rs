// SPDX-License-Identifier: Apache-2.0
// Copyright 2025-2026 Stride Authors

/// Vertex identifier, space-unique.
pub type VertexId = i64;

/// Edge type identifier. Negative values denote the reverse direction of
/// the logical edge `abs(edge_type)`.
pub type EdgeType = i32;

/// Tag identifier within a space.
pub type TagId = i32;

/// Graph space identifier.
pub type SpaceId = i32;

/// Disambiguates multi-edges between the same (src, dst, type) triple.
pub type EdgeRanking = i64;

/// Whether an edge type refers to the reverse direction.
pub fn is_reverse(edge_type: EdgeType) -> bool {
    edge_type < 0
}

/// The logical (always positive) edge type.
pub fn logical_edge(edge_type: EdgeType) -> EdgeType {
    edge_type.abs()
}
